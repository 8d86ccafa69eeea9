//! Image decoding and face cropping.

use image::{DynamicImage, GenericImageView, RgbaImage};

use emodet_models::PixelBox;

use crate::error::{VisionError, VisionResult};

/// Largest crop edge accepted, in pixels.
pub const MAX_CROP_DIMENSION: i64 = 16_384;

/// Decode uploaded bytes into an image, guessing the format from content.
pub fn decode_image(bytes: &[u8]) -> VisionResult<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Crop `[x1, y1, x2, y2]` out of `image`.
///
/// The rectangle is taken literally: parts outside the image are filled with
/// transparent black, so the result is always `(x2 - x1) x (y2 - y1)`.
/// Boxes with no area, or larger than [`MAX_CROP_DIMENSION`], are rejected.
pub fn crop_face(image: &DynamicImage, bbox: PixelBox) -> VisionResult<DynamicImage> {
    let [x1, y1, x2, y2] = bbox;
    let width = x2.saturating_sub(x1);
    let height = y2.saturating_sub(y1);

    if width <= 0 || height <= 0 {
        return Err(VisionError::invalid_crop(format!(
            "degenerate crop box [{x1}, {y1}, {x2}, {y2}]"
        )));
    }
    if width > MAX_CROP_DIMENSION || height > MAX_CROP_DIMENSION {
        return Err(VisionError::invalid_crop(format!(
            "crop box [{x1}, {y1}, {x2}, {y2}] exceeds {MAX_CROP_DIMENSION}px"
        )));
    }

    let (img_w, img_h) = image.dimensions();
    let (img_w, img_h) = (i64::from(img_w), i64::from(img_h));

    // Fully inside: plain sub-image, keeps the source pixel format.
    if x1 >= 0 && y1 >= 0 && x2 <= img_w && y2 <= img_h {
        return Ok(image.crop_imm(x1 as u32, y1 as u32, width as u32, height as u32));
    }

    let mut canvas = RgbaImage::new(width as u32, height as u32);

    let ix1 = x1.clamp(0, img_w);
    let iy1 = y1.clamp(0, img_h);
    let ix2 = x2.clamp(0, img_w);
    let iy2 = y2.clamp(0, img_h);

    if ix2 > ix1 && iy2 > iy1 {
        let visible = image
            .crop_imm(ix1 as u32, iy1 as u32, (ix2 - ix1) as u32, (iy2 - iy1) as u32)
            .to_rgba8();
        image::imageops::replace(&mut canvas, &visible, ix1 - x1, iy1 - y1);
    }

    Ok(DynamicImage::ImageRgba8(canvas))
}
