//! EXIF reconciliation for JPEG output.
//!
//! The cropped output is written upright, so the source's orientation tag no
//! longer applies. Reconciliation rebuilds the output's EXIF block from a
//! fixed set of capture tags read off the source, then records
//! `Orientation = 1` and the new pixel dimensions.

use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Field, In, Reader, Tag, Value};
use thiserror::Error;

/// Identifier that opens an EXIF APP1 segment.
const EXIF_HEADER: &[u8] = b"Exif\0\0";
const MARKER_SOI: [u8; 2] = [0xFF, 0xD8];
const MARKER_APP0: u8 = 0xE0;
const MARKER_APP1: u8 = 0xE1;
/// Largest APP1 payload: the 16-bit length also counts its own two bytes.
const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

/// Capture tags copied from the source image.
pub const CARRIED_TAGS: &[Tag] = &[
    Tag::Make,
    Tag::Model,
    Tag::DateTime,
    Tag::DateTimeOriginal,
    Tag::DateTimeDigitized,
    Tag::ExposureTime,
    Tag::FNumber,
    Tag::Flash,
    Tag::FocalLength,
    Tag::PhotographicSensitivity,
    Tag::WhiteBalance,
    Tag::SubSecTime,
    Tag::SubSecTimeOriginal,
    Tag::SubSecTimeDigitized,
    Tag::GPSLatitude,
    Tag::GPSLatitudeRef,
    Tag::GPSLongitude,
    Tag::GPSLongitudeRef,
    Tag::GPSAltitude,
    Tag::GPSAltitudeRef,
    Tag::GPSTimeStamp,
    Tag::GPSDateStamp,
    Tag::GPSProcessingMethod,
];

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Output is not a JPEG stream")]
    NotJpeg,

    #[error("Malformed JPEG segment at offset {0}")]
    MalformedSegment(usize),

    #[error("EXIF block of {0} bytes does not fit in an APP1 segment")]
    TooLarge(usize),

    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),
}

/// Capture tags of `source` that survive a crop.
///
/// A source without EXIF yields an empty list.
pub fn carried_fields(source: &[u8]) -> Result<Vec<Field>, MetadataError> {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(source)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(exif
        .fields()
        .filter(|field| field.ifd_num == In::PRIMARY && CARRIED_TAGS.contains(&field.tag))
        .cloned()
        .collect())
}

/// Rewrite the EXIF block of `output` for a `width x height` upright crop of
/// `source`.
pub fn reconcile_exif(
    source: &[u8],
    output: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, MetadataError> {
    let mut fields = carried_fields(source)?;
    fields.push(primary(Tag::Orientation, Value::Short(vec![1])));
    fields.push(primary(Tag::ImageWidth, Value::Long(vec![width])));
    fields.push(primary(Tag::ImageLength, Value::Long(vec![height])));
    fields.push(primary(Tag::PixelXDimension, Value::Long(vec![width])));
    fields.push(primary(Tag::PixelYDimension, Value::Long(vec![height])));
    embed_fields(output, &fields)
}

/// Replace any EXIF block in `jpeg` with one holding `fields`.
pub fn embed_fields(jpeg: &[u8], fields: &[Field]) -> Result<Vec<u8>, MetadataError> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false)?;
    splice_app1(jpeg, &tiff.into_inner())
}

fn primary(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

/// Insert an EXIF APP1 segment after SOI (and after a leading JFIF APP0),
/// dropping EXIF segments already present.
fn splice_app1(jpeg: &[u8], tiff: &[u8]) -> Result<Vec<u8>, MetadataError> {
    if jpeg.len() < 4 || jpeg[..2] != MARKER_SOI {
        return Err(MetadataError::NotJpeg);
    }
    let payload_len = EXIF_HEADER.len() + tiff.len();
    if payload_len > MAX_SEGMENT_PAYLOAD {
        return Err(MetadataError::TooLarge(payload_len));
    }

    // APPn segments directly after SOI
    let mut segments: Vec<(u8, &[u8])> = Vec::new();
    let mut pos = MARKER_SOI.len();
    while pos + 4 <= jpeg.len() && jpeg[pos] == 0xFF && (0xE0..=0xEF).contains(&jpeg[pos + 1]) {
        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let end = pos + 2 + len;
        if len < 2 || end > jpeg.len() {
            return Err(MetadataError::MalformedSegment(pos));
        }
        segments.push((jpeg[pos + 1], &jpeg[pos..end]));
        pos = end;
    }

    let is_exif = |(marker, segment): &(u8, &[u8])| *marker == MARKER_APP1 && segment[4..].starts_with(EXIF_HEADER);
    let leading = match segments.first() {
        Some((MARKER_APP0, _)) => 1,
        _ => 0,
    };

    let mut out = Vec::with_capacity(jpeg.len() + payload_len + 4);
    out.extend_from_slice(&MARKER_SOI);
    for (_, segment) in &segments[..leading] {
        out.extend_from_slice(segment);
    }
    out.extend_from_slice(&[0xFF, MARKER_APP1]);
    out.extend_from_slice(&((payload_len + 2) as u16).to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(tiff);
    for entry in segments[leading..].iter().filter(|entry| !is_exif(entry)) {
        out.extend_from_slice(entry.1);
    }
    out.extend_from_slice(&jpeg[pos..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{read_orientation, Bitmap, Orientation};
    use crate::encode::encode_bitmap;
    use crate::model::OutputFormat;
    use exif::Rational;

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        encode_bitmap(&Bitmap::filled(width, height, [40, 80, 120, 255]), OutputFormat::Jpeg, 90).unwrap()
    }

    fn ascii(text: &str) -> Value {
        Value::Ascii(vec![text.as_bytes().to_vec()])
    }

    fn camera_source() -> Vec<u8> {
        let fields = [
            primary(Tag::Make, ascii("Canon")),
            primary(Tag::Model, ascii("EOS 5D")),
            primary(Tag::Software, ascii("Editor 1.0")),
            primary(Tag::Orientation, Value::Short(vec![6])),
            primary(Tag::DateTimeOriginal, ascii("2024:05:01 10:20:30")),
            primary(
                Tag::GPSLatitude,
                Value::Rational(vec![
                    Rational::from((52, 1)),
                    Rational::from((30, 1)),
                    Rational::from((0, 1)),
                ]),
            ),
            primary(Tag::GPSLatitudeRef, ascii("N")),
        ];
        embed_fields(&jpeg(16, 8), &fields).unwrap()
    }

    fn read(bytes: &[u8]) -> exif::Exif {
        Reader::new().read_from_container(&mut Cursor::new(bytes)).unwrap()
    }

    fn ascii_of(exif: &exif::Exif, tag: Tag) -> Option<Vec<u8>> {
        match &exif.get_field(tag, In::PRIMARY)?.value {
            Value::Ascii(parts) => parts.first().cloned(),
            _ => None,
        }
    }

    #[test]
    fn test_embed_fields_round_trip() {
        let source = camera_source();
        assert_eq!(read_orientation(&source), Orientation::Rotate90CW);
        assert_eq!(ascii_of(&read(&source), Tag::Make), Some(b"Canon".to_vec()));
        // Still a decodable image
        assert!(image::load_from_memory(&source).is_ok());
    }

    #[test]
    fn test_carried_fields_filters_tags() {
        let fields = carried_fields(&camera_source()).unwrap();
        let tags: Vec<Tag> = fields.iter().map(|f| f.tag).collect();

        assert!(tags.contains(&Tag::Make));
        assert!(tags.contains(&Tag::DateTimeOriginal));
        assert!(tags.contains(&Tag::GPSLatitude));
        assert!(!tags.contains(&Tag::Software));
        assert!(!tags.contains(&Tag::Orientation));
    }

    #[test]
    fn test_source_without_exif_carries_nothing() {
        assert!(carried_fields(&jpeg(4, 4)).unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_resets_orientation_and_dimensions() {
        let output = reconcile_exif(&camera_source(), &jpeg(5, 3), 5, 3).unwrap();
        let exif = read(&output);

        assert_eq!(read_orientation(&output), Orientation::Normal);
        let uint = |tag| exif.get_field(tag, In::PRIMARY).and_then(|f| f.value.get_uint(0));
        assert_eq!(uint(Tag::PixelXDimension), Some(5));
        assert_eq!(uint(Tag::PixelYDimension), Some(3));
        assert_eq!(uint(Tag::ImageWidth), Some(5));
        assert_eq!(uint(Tag::ImageLength), Some(3));

        assert_eq!(ascii_of(&exif, Tag::Model), Some(b"EOS 5D".to_vec()));
        assert_eq!(ascii_of(&exif, Tag::GPSLatitudeRef), Some(b"N".to_vec()));
        assert!(exif.get_field(Tag::Software, In::PRIMARY).is_none());

        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 3));
    }

    #[test]
    fn test_reconcile_replaces_existing_exif_block() {
        let output = reconcile_exif(&camera_source(), &camera_source(), 16, 8).unwrap();
        let exif_segments = output
            .windows(EXIF_HEADER.len())
            .filter(|w| *w == EXIF_HEADER)
            .count();
        assert_eq!(exif_segments, 1);
        assert_eq!(read_orientation(&output), Orientation::Normal);
    }

    #[test]
    fn test_app1_follows_jfif_app0() {
        let base = jpeg(4, 4);
        // The JPEG encoder writes a JFIF APP0 first
        assert_eq!(base[3], MARKER_APP0);

        let output = embed_fields(&base, &[primary(Tag::Make, ascii("X"))]).unwrap();
        let app0_len = u16::from_be_bytes([output[4], output[5]]) as usize;
        let app1 = 2 + 2 + app0_len;
        assert_eq!(&output[app1..app1 + 2], &[0xFF, MARKER_APP1]);
        assert_eq!(&output[app1 + 4..app1 + 10], EXIF_HEADER);
    }

    #[test]
    fn test_splice_rejects_non_jpeg() {
        assert!(matches!(splice_app1(b"\x89PNG\r\n", b"MM"), Err(MetadataError::NotJpeg)));
    }

    #[test]
    fn test_splice_rejects_oversized_block() {
        let tiff = vec![0u8; MAX_SEGMENT_PAYLOAD];
        assert!(matches!(
            splice_app1(&jpeg(2, 2), &tiff),
            Err(MetadataError::TooLarge(_))
        ));
    }

    #[test]
    fn test_splice_rejects_truncated_segment() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x40, 0x00];
        assert!(matches!(
            splice_app1(&bytes, b"MM"),
            Err(MetadataError::MalformedSegment(2))
        ));
    }
}
