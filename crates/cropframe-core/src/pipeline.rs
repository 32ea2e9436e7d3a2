//! The crop request state machine.
//!
//! ```text
//! Validate -> Downscale? -> Rotate? -> ComputeOffsets -> DecideCropVsCopy
//!     -> CopyOriginal
//!     -> ExtractAndEncode -> ReconcileMetadata -> Finalize
//! ```
//!
//! Every stage consumes the previous bitmap and returns a new one. Any stage
//! may fail; the first error ends the request and nothing is written to the
//! destination.

use std::sync::{Arc, Weak};

use tracing::{debug, info, warn};

use crate::decode::{scale_bitmap, Bitmap, FilterType};
use crate::encode::encode_bitmap;
use crate::error::{CropError, Result};
use crate::geometry::{GeometryError, Rect};
use crate::metadata;
use crate::model::{CropParameters, CropResult, ImageState, Location};
use crate::storage::Storage;
use crate::transform::{extract_region, rotate_bitmap};

/// Everything the engine needs for one crop.
#[derive(Debug, Clone)]
pub struct CropRequest {
    /// The working bitmap the live view was showing.
    pub bitmap: Option<Bitmap>,
    pub state: ImageState,
    pub params: CropParameters,
}

impl CropRequest {
    pub fn new(bitmap: Bitmap, state: ImageState, params: CropParameters) -> Self {
        Self {
            bitmap: Some(bitmap),
            state,
            params,
        }
    }
}

/// Region of the working bitmap that becomes the output, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropOffsets {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Map the crop rect into working-bitmap pixels.
///
/// # Arguments
///
/// * `crop_rect` - Crop window in viewport coordinates
/// * `image_rect` - Bounding box of the transformed image
/// * `scale` - Viewport units per working-bitmap pixel
///
/// # Returns
///
/// Offsets and size rounded to the nearest pixel, ties towards positive
/// infinity.
///
/// `image_rect` is the bounding box of the transformed image, which is also
/// the extent of the rotated working bitmap scaled by `scale`.
pub fn compute_offsets(crop_rect: &Rect, image_rect: &Rect, scale: f64) -> CropOffsets {
    CropOffsets {
        x: round_half_up((crop_rect.left - image_rect.left) / scale),
        y: round_half_up((crop_rect.top - image_rect.top) / scale),
        width: round_half_up(crop_rect.width() / scale),
        height: round_half_up(crop_rect.height() / scale),
    }
}

/// Round to the nearest integer, ties towards positive infinity (`-0.5` -> `0`).
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Tolerated edge drift, in viewport units, before a crop is considered real:
/// one unit plus one per thousand output pixels on the longer side.
pub fn pixel_error(width: i64, height: i64) -> i64 {
    1 + (width.max(height) as f64 / 1000.0).round() as i64
}

/// Whether the output has to be re-encoded rather than copied.
pub fn should_crop(state: &ImageState, has_max_size: bool, width: i64, height: i64) -> bool {
    let tolerance = pixel_error(width, height) as f64;
    has_max_size
        || state.crop_rect.max_edge_delta(&state.current_image_rect) > tolerance
        || state.current_angle != 0.0
}

/// Factor to shrink the working bitmap by so the crop fits `max_width x max_height`.
///
/// `None` when no maximum is set or the crop already fits.
pub fn downscale_factor(crop_rect: &Rect, scale: f64, max_width: u32, max_height: u32) -> Option<f64> {
    if max_width == 0 || max_height == 0 {
        return None;
    }
    let crop_width = crop_rect.width() / scale;
    let crop_height = crop_rect.height() / scale;
    if crop_width <= max_width as f64 && crop_height <= max_height as f64 {
        return None;
    }
    Some((max_width as f64 / crop_width).min(max_height as f64 / crop_height))
}

/// Run a crop request to completion on the current thread.
///
/// The storage handle is upgraded only around each I/O step; if its owner
/// has released it the request fails with [`CropError::ContextGone`].
pub fn crop_image(request: CropRequest, storage: &Weak<dyn Storage>) -> Result<CropResult> {
    let CropRequest {
        bitmap,
        state,
        params,
    } = request;

    let (bitmap, output) = validate(bitmap, &state, &params, storage)?;
    let mut scale = state.current_scale;

    let bitmap = match downscale_factor(
        &state.crop_rect,
        scale,
        params.max_result_width,
        params.max_result_height,
    ) {
        Some(resize_scale) => {
            debug!(resize_scale, from_width = bitmap.width, from_height = bitmap.height, "Downscaling bitmap");
            scale /= resize_scale;
            scale_bitmap(bitmap, resize_scale, FilterType::Nearest)?
        }
        None => bitmap,
    };

    let bitmap = if state.current_angle != 0.0 {
        debug!(angle = state.current_angle, "Rotating bitmap");
        rotate_bitmap(bitmap, state.current_angle)
    } else {
        bitmap
    };

    let offsets = compute_offsets(&state.crop_rect, &state.current_image_rect, scale);
    let crop = should_crop(&state, params.has_max_size(), offsets.width, offsets.height);
    info!(
        should_crop = crop,
        offset_x = offsets.x,
        offset_y = offsets.y,
        width = offsets.width,
        height = offsets.height,
        "Crop decided"
    );

    let result = CropResult {
        output: output.clone(),
        offset_x: offsets.x,
        offset_y: offsets.y,
        width: offsets.width.max(0) as u32,
        height: offsets.height.max(0) as u32,
        matrix_values: state.matrix.values(),
        crop_rect: state.crop_rect,
        copied: !crop,
    };

    if !crop {
        drop(bitmap);
        copy_original(storage, &params.input_location, &output)?;
        return Ok(result);
    }

    let region = extract_region(&bitmap, offsets.x, offsets.y, offsets.width, offsets.height)?;
    drop(bitmap);
    let mut encoded = encode_bitmap(&region, params.output_format, params.output_quality)?;
    drop(region);

    if params.output_format.carries_exif() {
        encoded = reconcile_metadata(storage, &params.input_location, encoded, result.width, result.height)?;
    }

    let storage = upgrade(storage, "writing the output")?;
    storage
        .write_atomic(&output, &encoded)
        .map_err(|e| CropError::io(format!("writing {}", output), e))?;
    debug!(bytes = encoded.len(), output = %output, "Output written");

    Ok(result)
}

fn validate(
    bitmap: Option<Bitmap>,
    state: &ImageState,
    params: &CropParameters,
    storage: &Weak<dyn Storage>,
) -> Result<(Bitmap, Location)> {
    let bitmap = bitmap.ok_or_else(|| CropError::MissingSource("no bitmap supplied".to_string()))?;
    let expected = bitmap.width as usize * bitmap.height as usize * Bitmap::CHANNELS;
    if bitmap.is_empty() || bitmap.pixels.len() != expected {
        return Err(CropError::MissingSource(format!(
            "bitmap {}x{} with {} bytes",
            bitmap.width,
            bitmap.height,
            bitmap.pixels.len()
        )));
    }
    if state.current_image_rect.is_empty() {
        return Err(CropError::EmptyRegion(format!(
            "image rect {:?}",
            state.current_image_rect
        )));
    }
    if state.crop_rect.is_empty() {
        return Err(CropError::EmptyRegion(format!("crop rect {:?}", state.crop_rect)));
    }
    let output = params
        .output_location
        .clone()
        .ok_or_else(|| CropError::MissingDestination("no output location".to_string()))?;

    GeometryError::check_positive("scale", state.current_scale)?;
    if !state.current_angle.is_finite() {
        return Err(GeometryError::InvalidValue {
            what: "angle",
            value: state.current_angle,
        }
        .into());
    }

    // Resolve the destination before any pixel work
    let storage = upgrade(storage, "resolving the destination")?;
    if !storage.can_write(&output) {
        return Err(CropError::MissingDestination(format!("{} is not writable", output)));
    }

    Ok((bitmap, output))
}

fn copy_original(storage: &Weak<dyn Storage>, input: &Location, output: &Location) -> Result<()> {
    if input == output {
        debug!(location = %input, "Source is the destination, nothing to copy");
        return Ok(());
    }
    let storage = upgrade(storage, "copying the source")?;
    storage
        .copy(input, output)
        .map_err(|e| CropError::io(format!("copying {} to {}", input, output), e))
}

/// Carry source EXIF over to JPEG output. Failures keep the output as is.
fn reconcile_metadata(
    storage: &Weak<dyn Storage>,
    input: &Location,
    encoded: Vec<u8>,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let source = {
        let storage = upgrade(storage, "reading source metadata")?;
        if !storage.exposes_metadata(input) {
            debug!(location = %input, "Source metadata not exposed, skipping EXIF");
            return Ok(encoded);
        }
        match storage.read(input) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, location = %input, "Could not read source for EXIF");
                return Ok(encoded);
            }
        }
    };

    match metadata::reconcile_exif(&source, &encoded, width, height) {
        Ok(reconciled) => Ok(reconciled),
        Err(e) => {
            warn!(error = %e, "Could not carry EXIF over to the output");
            Ok(encoded)
        }
    }
}

fn upgrade(storage: &Weak<dyn Storage>, step: &str) -> Result<Arc<dyn Storage>> {
    storage
        .upgrade()
        .ok_or_else(|| CropError::ContextGone(format!("storage released before {}", step)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CropErrorKind;
    use crate::geometry::Affine;
    use crate::storage::MemoryStorage;

    fn state(crop: Rect, image: Rect, scale: f64, angle: f64) -> ImageState {
        ImageState::new(crop, image, Affine::identity(), scale, angle)
    }

    fn memory() -> (Arc<dyn Storage>, Weak<dyn Storage>) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let weak = Arc::downgrade(&storage);
        (storage, weak)
    }

    fn params() -> CropParameters {
        CropParameters::new(
            Location::Content("mem://in".to_string()),
            Some(Location::Content("mem://out".to_string())),
        )
    }

    #[test]
    fn test_compute_offsets() {
        let crop = Rect::new(1000.0, 1000.0, 2000.0, 2000.0);
        let image = Rect::new(0.0, 0.0, 8000.0, 6000.0);
        assert_eq!(
            compute_offsets(&crop, &image, 2.5),
            CropOffsets {
                x: 400,
                y: 400,
                width: 400,
                height: 400
            }
        );
    }

    #[test]
    fn test_compute_offsets_rounds_to_nearest() {
        let crop = Rect::new(10.6, 0.0, 110.4, 50.0);
        let image = Rect::new(0.0, 0.0, 200.0, 100.0);
        let offsets = compute_offsets(&crop, &image, 1.0);
        assert_eq!((offsets.x, offsets.y, offsets.width, offsets.height), (11, 0, 100, 50));
    }

    #[test]
    fn test_compute_offsets_negative_tie_rounds_up() {
        let crop = Rect::new(-0.5, 0.0, 50.5, 50.0);
        let image = Rect::new(0.0, 0.0, 100.0, 100.0);
        let offsets = compute_offsets(&crop, &image, 1.0);
        assert_eq!((offsets.x, offsets.y, offsets.width, offsets.height), (0, 0, 51, 50));
        assert_eq!(round_half_up(-1.5), -1);
        assert_eq!(round_half_up(2.5), 3);
    }

    #[test]
    fn test_half_pixel_overhang_still_extracts() {
        let (_owner, weak) = memory();
        let request = CropRequest::new(
            Bitmap::filled(100, 100, [10, 20, 30, 255]),
            state(Rect::new(-0.5, 0.0, 50.5, 50.0), Rect::new(0.0, 0.0, 100.0, 100.0), 1.0, 0.0),
            params().with_format(crate::model::OutputFormat::Png, 100),
        );
        let result = crop_image(request, &weak).unwrap();
        assert_eq!((result.offset_x, result.width, result.height), (0, 51, 50));
    }

    #[test]
    fn test_pixel_error() {
        assert_eq!(pixel_error(2000, 1), 3);
        assert_eq!(pixel_error(1000, 800), 2);
        assert_eq!(pixel_error(499, 10), 1);
        assert_eq!(pixel_error(500, 10), 2);
    }

    #[test]
    fn test_should_crop_edge_deltas() {
        let image = Rect::new(0.0, 0.0, 2000.0, 1.0);

        let near = state(Rect::new(2.0, 0.0, 2000.0, 1.0), image, 1.0, 0.0);
        assert!(!should_crop(&near, false, 2000, 1));

        let far = state(Rect::new(4.0, 0.0, 2000.0, 1.0), image, 1.0, 0.0);
        assert!(should_crop(&far, false, 2000, 1));
    }

    #[test]
    fn test_should_crop_on_angle_or_max_size() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(should_crop(&state(rect, rect, 1.0, 45.0), false, 100, 100));
        assert!(should_crop(&state(rect, rect, 1.0, 0.0), true, 100, 100));
        assert!(!should_crop(&state(rect, rect, 1.0, 0.0), false, 100, 100));
    }

    #[test]
    fn test_downscale_factor() {
        let crop = Rect::new(1000.0, 1000.0, 2000.0, 2000.0);
        assert_eq!(downscale_factor(&crop, 2.0, 400, 400), Some(0.8));
        assert_eq!(downscale_factor(&crop, 2.0, 500, 500), None);
        assert_eq!(downscale_factor(&crop, 2.0, 400, 0), None);
        // The tighter side wins
        assert_eq!(downscale_factor(&crop, 1.0, 500, 250), Some(0.25));
    }

    #[test]
    fn test_missing_bitmap() {
        let (_owner, weak) = memory();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let request = CropRequest {
            bitmap: None,
            state: state(rect, rect, 1.0, 0.0),
            params: params(),
        };
        let err = crop_image(request, &weak).unwrap_err();
        assert_eq!(err.kind(), CropErrorKind::MissingSource);
    }

    #[test]
    fn test_inconsistent_bitmap_is_missing_source() {
        let (_owner, weak) = memory();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let bitmap = Bitmap {
            width: 10,
            height: 10,
            pixels: vec![0; 12],
        };
        let request = CropRequest::new(bitmap, state(rect, rect, 1.0, 0.0), params());
        assert_eq!(crop_image(request, &weak).unwrap_err().kind(), CropErrorKind::MissingSource);
    }

    #[test]
    fn test_empty_image_rect() {
        let (_owner, weak) = memory();
        let request = CropRequest::new(
            Bitmap::filled(10, 10, [0, 0, 0, 255]),
            state(Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(5.0, 5.0, 5.0, 9.0), 1.0, 0.0),
            params(),
        );
        assert_eq!(crop_image(request, &weak).unwrap_err().kind(), CropErrorKind::EmptyRegion);
    }

    #[test]
    fn test_missing_output_location() {
        let (_owner, weak) = memory();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let mut params = params();
        params.output_location = None;
        let request = CropRequest::new(Bitmap::filled(10, 10, [0; 4]), state(rect, rect, 1.0, 0.0), params);
        assert_eq!(
            crop_image(request, &weak).unwrap_err().kind(),
            CropErrorKind::MissingDestination
        );
    }

    #[test]
    fn test_zero_scale_is_invalid_geometry() {
        let (_owner, weak) = memory();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let request = CropRequest::new(Bitmap::filled(10, 10, [0; 4]), state(rect, rect, 0.0, 0.0), params());
        assert_eq!(
            crop_image(request, &weak).unwrap_err().kind(),
            CropErrorKind::InvalidGeometry
        );
    }

    #[test]
    fn test_released_storage_is_context_gone() {
        let (owner, weak) = memory();
        drop(owner);
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let request = CropRequest::new(Bitmap::filled(10, 10, [0; 4]), state(rect, rect, 1.0, 0.0), params());
        assert_eq!(crop_image(request, &weak).unwrap_err().kind(), CropErrorKind::ContextGone);
    }

    #[test]
    fn test_region_outside_bitmap_fails() {
        let storage = Arc::new(MemoryStorage::new());
        let owner: Arc<dyn Storage> = storage.clone();
        let weak = Arc::downgrade(&owner);

        // Crop rect reaches past the image rect on the right
        let request = CropRequest::new(
            Bitmap::filled(100, 100, [0, 0, 0, 255]),
            state(Rect::new(50.0, 0.0, 150.0, 100.0), Rect::new(0.0, 0.0, 100.0, 100.0), 1.0, 0.0),
            params(),
        );
        let err = crop_image(request, &weak).unwrap_err();
        assert_eq!(err.kind(), CropErrorKind::RegionOutOfBounds);
        assert!(!storage.contains(&Location::Content("mem://out".to_string())));
    }

    #[test]
    fn test_crop_writes_png_without_metadata() {
        let storage = Arc::new(MemoryStorage::new());
        let owner: Arc<dyn Storage> = storage.clone();
        let weak = Arc::downgrade(&owner);

        let params = params().with_format(crate::model::OutputFormat::Png, 100);
        let request = CropRequest::new(
            Bitmap::filled(100, 50, [20, 40, 60, 255]),
            state(Rect::new(10.0, 10.0, 50.0, 40.0), Rect::new(0.0, 0.0, 100.0, 50.0), 1.0, 0.0),
            params,
        );
        let result = crop_image(request, &weak).unwrap();
        assert!(!result.copied);
        assert_eq!((result.offset_x, result.offset_y, result.width, result.height), (10, 10, 40, 30));

        let bytes = storage.get(&Location::Content("mem://out".to_string())).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().into_rgba8();
        assert_eq!(decoded.dimensions(), (40, 30));
        assert_eq!(decoded.get_pixel(0, 0).0, [20, 40, 60, 255]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: offsets depend only on their inputs.
        #[test]
        fn prop_offsets_idempotent(
            left in -1000.0f64..1000.0,
            top in -1000.0f64..1000.0,
            width in 1.0f64..2000.0,
            height in 1.0f64..2000.0,
            scale in 0.01f64..20.0,
        ) {
            let crop = Rect::from_xywh(left, top, width, height);
            let image = Rect::new(-1500.0, -1500.0, 3500.0, 3500.0);
            prop_assert_eq!(compute_offsets(&crop, &image, scale), compute_offsets(&crop, &image, scale));
        }

        /// Property: the pixel error grows by one per thousand pixels.
        #[test]
        fn prop_pixel_error_bounds(width in 0i64..100_000, height in 0i64..100_000) {
            let error = pixel_error(width, height);
            let longest = width.max(height);
            prop_assert!(error >= 1);
            prop_assert!((error - 1 - longest / 1000).abs() <= 1);
        }
    }
}
