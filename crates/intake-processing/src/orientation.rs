//! EXIF orientation correction for scanned images.

use exif::{In, Reader, Tag};
use image::{imageops, DynamicImage};
use std::io::Cursor;

/// EXIF orientation tag value, 1 when absent or unreadable.
pub fn read_exif_orientation(data: &[u8]) -> u32 {
    Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .unwrap_or(1)
}

/// Rotation and flip needed to bring an image upright for a given orientation.
/// Returns (rotate_degrees_clockwise, flip_horizontal, flip_vertical); the
/// rotation is applied first.
pub fn orientation_transforms(orientation: u32) -> (Option<u16>, bool, bool) {
    match orientation {
        1 => (None, false, false),      // Normal
        2 => (None, true, false),       // Mirror horizontal
        3 => (Some(180), false, false), // Rotate 180
        4 => (None, false, true),       // Mirror vertical
        5 => (Some(90), true, false),   // Transpose
        6 => (Some(90), false, false),  // Rotate 90 CW
        7 => (Some(270), true, false),  // Transverse
        8 => (Some(270), false, false), // Rotate 270 CW
        _ => (None, false, false),      // Invalid, treat as normal
    }
}

fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
    match angle {
        90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
        180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
        270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
        _ => img,
    }
}

/// Apply the EXIF orientation stored in `data` to the decoded `img`.
pub fn apply_exif_orientation(img: DynamicImage, data: &[u8]) -> DynamicImage {
    let orientation = read_exif_orientation(data);
    apply_orientation(img, orientation)
}

pub fn apply_orientation(mut img: DynamicImage, orientation: u32) -> DynamicImage {
    let (rotate, flip_h, flip_v) = orientation_transforms(orientation);
    if orientation != 1 {
        tracing::debug!(
            orientation,
            rotate = ?rotate,
            flip_horizontal = flip_h,
            flip_vertical = flip_v,
            "Applying EXIF orientation"
        );
    }

    if let Some(angle) = rotate {
        img = rotate_by_angle(img, angle);
    }
    if flip_h {
        img = img.fliph();
    }
    if flip_v {
        img = img.flipv();
    }
    img
}
