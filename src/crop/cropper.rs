/// Interactive crop state
///
/// A crop session keeps the pan offset and zoom the user is playing with and
/// derives the pixel rectangle that will be cut out of the source. The
/// rectangle is recomputed on every change and always stays inside the image.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::data_url::DataUrl;
use super::renderer::probe_dimensions;
use crate::error::ImageError;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 3.0;

/// Region of the source image, in source pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the rectangle is non-empty and fits in a `width`x`height` image
    pub fn check_within(&self, width: u32, height: u32) -> Result<(), ImageError> {
        let fits = self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height);

        if fits {
            Ok(())
        } else {
            Err(ImageError::OutOfBounds {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                image_width: width,
                image_height: height,
            })
        }
    }
}

/// Target width/height ratio enforced by the cropper
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectRatio(f64);

impl AspectRatio {
    /// Square crops for client portraits
    pub const SQUARE: AspectRatio = AspectRatio(1.0);
    /// 450x350 cards for project images
    pub const PROJECT_CARD: AspectRatio = AspectRatio(450.0 / 350.0);

    pub fn new(ratio: f64) -> Result<Self, ImageError> {
        if ratio.is_finite() && ratio > 0.0 {
            Ok(Self(ratio))
        } else {
            Err(ImageError::InvalidAspect(ratio))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Pan of the image relative to the crop window, in source pixels.
///
/// Positive `x` moves the image right, which moves the window left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// An open crop session (the pending upload)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropSession {
    source: DataUrl,
    source_width: u32,
    source_height: u32,
    aspect: AspectRatio,
    offset: Offset,
    zoom: f64,
    area: PixelRect,
}

impl CropSession {
    /// Start a session on `source`, probing its dimensions
    pub fn open(source: DataUrl, aspect: AspectRatio, max_dimension: u32) -> Result<Self, ImageError> {
        let (source_width, source_height) = probe_dimensions(&source, max_dimension)?;
        debug!("Crop session opened on {source_width}x{source_height} source");
        Ok(Self::with_dimensions(source, source_width, source_height, aspect))
    }

    /// Start a session when the dimensions are already known
    pub fn with_dimensions(source: DataUrl, source_width: u32, source_height: u32, aspect: AspectRatio) -> Self {
        let mut session = Self {
            source,
            source_width: source_width.max(1),
            source_height: source_height.max(1),
            aspect,
            offset: Offset::default(),
            zoom: MIN_ZOOM,
            area: PixelRect::new(0, 0, 1, 1),
        };
        session.recompute();
        session
    }

    pub fn source(&self) -> &DataUrl {
        &self.source
    }

    pub fn source_size(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// The committed crop rectangle
    pub fn area(&self) -> PixelRect {
        self.area
    }

    pub fn set_offset(&mut self, offset: Offset) {
        self.offset = offset;
        self.recompute();
    }

    /// Drag the image by a delta
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx;
        self.offset.y += dy;
        self.recompute();
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
        self.recompute();
    }

    /// Scroll-wheel style relative zoom
    pub fn zoom_by(&mut self, delta: f64) {
        self.zoom += delta;
        self.recompute();
    }

    /// Finish the session, handing back what the renderer needs
    pub fn into_parts(self) -> (DataUrl, PixelRect) {
        (self.source, self.area)
    }

    /// Clamp zoom and offset, then derive the pixel rectangle.
    fn recompute(&mut self) {
        let width = f64::from(self.source_width);
        let height = f64::from(self.source_height);
        let aspect = self.aspect.value();

        // NaN from a bad gesture resets to the default
        self.zoom = if self.zoom.is_finite() {
            self.zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            MIN_ZOOM
        };

        // Largest window of the target aspect that fits the source at zoom 1
        let (base_width, base_height) = if width / height > aspect {
            (height * aspect, height)
        } else {
            (width, width / aspect)
        };

        let crop_width = (base_width / self.zoom).max(1.0);
        let crop_height = (base_height / self.zoom).max(1.0);

        let max_x = ((width - crop_width) / 2.0).max(0.0);
        let max_y = ((height - crop_height) / 2.0).max(0.0);
        self.offset.x = finite_or_zero(self.offset.x).clamp(-max_x, max_x);
        self.offset.y = finite_or_zero(self.offset.y).clamp(-max_y, max_y);

        let left = (width - crop_width) / 2.0 - self.offset.x;
        let top = (height - crop_height) / 2.0 - self.offset.y;

        let rect_width = (crop_width.round() as u32).clamp(1, self.source_width);
        let rect_height = (crop_height.round() as u32).clamp(1, self.source_height);
        let x = (left.round().max(0.0) as u32).min(self.source_width - rect_width);
        let y = (top.round().max(0.0) as u32).min(self.source_height - rect_height);

        self.area = PixelRect::new(x, y, rect_width, rect_height);
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
