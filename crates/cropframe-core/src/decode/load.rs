//! Source loading with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::DynamicImage;
use image::ImageReader;

use super::{Bitmap, DecodeError, Orientation};
use crate::model::ExifInfo;

/// Decode an encoded image into an upright RGBA bitmap.
///
/// The EXIF orientation is read first and baked into the pixels, so the
/// returned bitmap never needs further rotation for display. The returned
/// [`ExifInfo`] records what was applied.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` if the bytes cannot be decoded and
/// `DecodeError::InvalidDimensions` for a zero-sized image.
pub fn load_bitmap(bytes: &[u8]) -> Result<(Bitmap, ExifInfo), DecodeError> {
    let orientation = read_orientation(bytes);
    let img = decode_dynamic(bytes)?;
    let bitmap = Bitmap::from_rgba_image(apply_orientation(img, orientation).into_rgba8());
    if bitmap.is_empty() {
        return Err(DecodeError::InvalidDimensions {
            width: bitmap.width,
            height: bitmap.height,
        });
    }
    Ok((bitmap, ExifInfo::new(orientation)))
}

/// Decode without applying EXIF orientation.
///
/// For hosts that apply the orientation themselves, e.g. through the image
/// matrix with the orientation from [`read_orientation`].
pub fn load_bitmap_no_orientation(bytes: &[u8]) -> Result<Bitmap, DecodeError> {
    let img = decode_dynamic(bytes)?;
    Ok(Bitmap::from_rgba_image(img.into_rgba8()))
}

/// EXIF orientation of encoded bytes.
///
/// Returns `Orientation::Normal` when there is no EXIF block or no
/// orientation tag.
pub fn read_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    let Ok(exif) = Reader::new().read_from_container(&mut cursor) else {
        return Orientation::Normal;
    };
    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(Orientation::from)
        .unwrap_or_default()
}

fn decode_dynamic(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::InvalidFormat);
    }
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }
    reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
