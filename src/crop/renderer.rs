/// Crop renderer
///
/// Copies a pixel rectangle out of a source image 1:1 and re-encodes it as
/// JPEG. The rectangle is already in source pixel units, so nothing is scaled.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, Rgb, RgbImage, Rgba};
use std::io::Cursor;
use tokio::task;
use tracing::debug;

use super::cropper::PixelRect;
use super::data_url::DataUrl;
use crate::config::ImageLimits;
use crate::error::ImageError;

/// MIME type of every rendered crop
pub const OUTPUT_MIME: &str = "image/jpeg";

/// Read the pixel dimensions from the image header without decoding pixels.
///
/// Fails if the data is not a recognised image or if either side exceeds
/// `max_dimension`.
pub fn probe_dimensions(source: &DataUrl, max_dimension: u32) -> Result<(u32, u32), ImageError> {
    let (width, height) = ImageReader::new(Cursor::new(source.bytes()))
        .with_guessed_format()?
        .into_dimensions()
        .map_err(ImageError::Decode)?;

    if width > max_dimension || height > max_dimension {
        return Err(ImageError::DimensionsTooLarge {
            width,
            height,
            limit: max_dimension,
        });
    }

    Ok((width, height))
}

/// Crop `area` out of `source` and encode the result as a JPEG data URL
pub fn render_crop(source: &DataUrl, area: PixelRect, limits: &ImageLimits) -> Result<DataUrl, ImageError> {
    let (width, height) = probe_dimensions(source, limits.max_dimension)?;
    area.check_within(width, height)?;

    let img = image::load_from_memory(source.bytes()).map_err(ImageError::Decode)?;
    let cropped = img.crop_imm(area.x, area.y, area.width, area.height);

    let rgb = DynamicImage::ImageRgb8(flatten_onto_black(&cropped));

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, limits.jpeg_quality);
    rgb.write_with_encoder(encoder).map_err(ImageError::Encode)?;

    debug!(
        "Cropped {}x{} at ({}, {}) from {}x{} source ({} bytes)",
        area.width,
        area.height,
        area.x,
        area.y,
        width,
        height,
        buffer.len()
    );

    Ok(DataUrl::new(OUTPUT_MIME, buffer))
}

/// JPEG has no alpha channel. Transparent pixels come out black, the way a
/// browser canvas exports them.
fn flatten_onto_black(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let over_black = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
        Rgb([over_black(r), over_black(g), over_black(b)])
    })
}

/// Run [`render_crop`] on the blocking pool
pub async fn render_crop_async(
    source: DataUrl,
    area: PixelRect,
    limits: ImageLimits,
) -> Result<DataUrl, ImageError> {
    // Decoding and encoding are CPU-bound
    task::spawn_blocking(move || render_crop(&source, area, &limits))
        .await
        .map_err(|e| ImageError::Task(e.to_string()))?
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};

    /// Build a PNG data URL with a gradient so crops are distinguishable
    pub(crate) fn gradient_png(width: u32, height: u32) -> DataUrl {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        DataUrl::new("image/png", bytes)
    }

    fn decode(url: &DataUrl) -> DynamicImage {
        image::load_from_memory(url.bytes()).unwrap()
    }

    #[test]
    fn test_output_matches_rect_dimensions() {
        let source = gradient_png(1200, 800);
        let area = PixelRect::new(100, 100, 450, 350);

        let cropped = render_crop(&source, area, &ImageLimits::default()).unwrap();

        assert_eq!(cropped.mime(), OUTPUT_MIME);
        let img = decode(&cropped);
        assert_eq!((img.width(), img.height()), (450, 350));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let source = gradient_png(320, 240);
        let area = PixelRect::new(10, 20, 100, 80);
        let limits = ImageLimits::default();

        let first = render_crop(&source, area, &limits).unwrap();
        let second = render_crop(&source, area, &limits).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_full_image_crop() {
        let source = gradient_png(64, 48);
        let cropped = render_crop(&source, PixelRect::new(0, 0, 64, 48), &ImageLimits::default()).unwrap();

        let img = decode(&cropped);
        assert_eq!((img.width(), img.height()), (64, 48));
    }

    #[test]
    fn test_rect_outside_image_is_rejected() {
        let source = gradient_png(100, 100);
        let result = render_crop(&source, PixelRect::new(60, 0, 50, 50), &ImageLimits::default());

        assert!(matches!(result, Err(ImageError::OutOfBounds { .. })));
    }

    #[test]
    fn test_garbage_source_is_a_decode_error() {
        let source = DataUrl::new("image/png", b"definitely not pixels".to_vec());
        let result = render_crop(&source, PixelRect::new(0, 0, 1, 1), &ImageLimits::default());

        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn test_dimension_limit_is_enforced() {
        let source = gradient_png(300, 20);
        let limits = ImageLimits {
            max_dimension: 256,
            ..ImageLimits::default()
        };

        let result = render_crop(&source, PixelRect::new(0, 0, 10, 10), &limits);
        assert!(matches!(
            result,
            Err(ImageError::DimensionsTooLarge { width: 300, height: 20, limit: 256 })
        ));
    }

    #[test]
    fn test_transparent_pixels_render_black() {
        // Left half fully transparent white, right half opaque white
        let img = RgbaImage::from_fn(16, 16, |x, _| if x < 8 { Rgba([255, 255, 255, 0]) } else { Rgba([255; 4]) });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let source = DataUrl::new("image/png", bytes);

        let cropped = render_crop(&source, PixelRect::new(0, 0, 16, 16), &ImageLimits::default()).unwrap();
        let rgb = decode(&cropped).to_rgb8();

        assert!(rgb.get_pixel(2, 8).0.iter().all(|&c| c < 16));
        assert!(rgb.get_pixel(13, 8).0.iter().all(|&c| c > 240));
    }

    #[test]
    fn test_opaque_pixels_are_unchanged_by_flattening() {
        let img = decode(&gradient_png(40, 30));
        assert_eq!(flatten_onto_black(&img), img.to_rgb8());
    }

    #[tokio::test]
    async fn test_async_render() {
        let source = gradient_png(200, 200);
        let cropped = render_crop_async(source, PixelRect::new(50, 50, 100, 100), ImageLimits::default())
            .await
            .unwrap();

        let img = decode(&cropped);
        assert_eq!((img.width(), img.height()), (100, 100));
    }
}
