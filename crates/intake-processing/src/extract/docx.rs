use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, TableCellContent, TableChild,
    TableRowChild,
};

use super::ExtractError;

fn push_paragraph(paragraph: &Paragraph, output: &mut String) {
    for child in &paragraph.children {
        match child {
            ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    if let RunChild::Text(text) = run_child {
                        output.push_str(&text.text);
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let ParagraphChild::Run(run) = inner {
                        for run_child in &run.children {
                            if let RunChild::Text(text) = run_child {
                                output.push_str(&text.text);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Body text of a DOCX document: paragraphs one per line, table rows one per
/// line with cells separated by ` | `.
pub(crate) fn extract_docx(data: &[u8]) -> Result<String, ExtractError> {
    let docx = docx_rs::read_docx(data).map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut output = String::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                push_paragraph(paragraph, &mut output);
                output.push('\n');
            }
            DocumentChild::Table(table) => {
                for row in &table.rows {
                    let TableChild::TableRow(row) = row;
                    let mut cells = Vec::new();
                    for cell in &row.cells {
                        let TableRowChild::TableCell(cell) = cell;
                        let mut text = String::new();
                        for content in &cell.children {
                            if let TableCellContent::Paragraph(paragraph) = content {
                                push_paragraph(paragraph, &mut text);
                            }
                        }
                        cells.push(text);
                    }
                    output.push_str(&cells.join(" | "));
                    output.push('\n');
                }
            }
            _ => {}
        }
    }

    Ok(output.trim().to_string())
}
