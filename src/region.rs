//! Detection boxes and the plate region cropped out of them.

use image::{ GenericImageView, RgbImage };
use serde::Serialize;

use std::convert::TryFrom;

use crate::config::RegionConfig;

/// One candidate box from the detector, in pixel coordinates of the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub confidence: f32,
}

impl Detection {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f32) -> Self {
        Self { x1, y1, x2, y2, confidence }
    }

    /// The full box, without the plate band shrink.
    pub fn bounds(&self) -> RegionOfInterest {
        RegionOfInterest { x1: self.x1, y1: self.y1, x2: self.x2, y2: self.y2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionOfInterest {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl RegionOfInterest {
    pub fn width(&self) -> i64 {
        i64::from(self.x2) - i64::from(self.x1)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.y2) - i64::from(self.y1)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Intersection with a `width` x `height` frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let (width, height) = (width as i32, height as i32);
        Self {
            x1: self.x1.max(0).min(width),
            y1: self.y1.max(0).min(height),
            x2: self.x2.max(0).min(width),
            y2: self.y2.max(0).min(height),
        }
    }
}

/// Degenerate box, or a crop with nothing left in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryError;

/// A region together with its owned pixels.
#[derive(Debug, Clone)]
pub struct Crop {
    pub roi: RegionOfInterest,
    pub pixels: RgbImage,
}

#[derive(Debug, Clone)]
pub struct RegionExtractor {
    height_ratio: f64,
    width_ratio: f64,
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self::new(&RegionConfig::default())
    }
}

impl RegionExtractor {

    pub fn new(config: &RegionConfig) -> Self {
        Self { height_ratio: config.height_ratio, width_ratio: config.width_ratio }
    }

    /// Shrinks the box to the band that holds the plate characters.
    /// Height is cut from the bottom, width is cut evenly from both sides.
    pub fn region(&self, detection: &Detection) -> Result<RegionOfInterest, GeometryError> {
        let Detection { x1, y1, x2, y2, .. } = *detection;
        if x1 >= x2 || y1 >= y2 {
            return Err(GeometryError);
        }
        // i64 so boxes spanning most of the i32 range cannot overflow
        let (x1, y1) = (i64::from(x1), i64::from(y1));
        let width = i64::from(x2) - x1;
        let height = i64::from(y2) - y1;
        let new_height = (height as f64 * self.height_ratio).floor() as i64;
        let new_width = (width as f64 * self.width_ratio).floor() as i64;
        let roi = RegionOfInterest {
            x1: coordinate(x1 + (width - new_width) / 2)?,
            y1: coordinate(y1)?,
            x2: coordinate(x1 + new_width)?,
            y2: coordinate(y1 + new_height)?,
        };
        if roi.is_empty() {
            return Err(GeometryError);
        }
        Ok(roi)
    }

    /// Region plus an owned copy of its pixels, so later drawing on the
    /// frame never reaches the crop.
    pub fn extract(&self, frame: &RgbImage, detection: &Detection) -> Result<Crop, GeometryError> {
        let (width, height) = frame.dimensions();
        let roi = self.region(detection)?.clamp_to(width, height);
        if roi.is_empty() {
            return Err(GeometryError);
        }
        let pixels = frame
            .view(roi.x1 as u32, roi.y1 as u32, roi.width() as u32, roi.height() as u32)
            .to_image();
        Ok(Crop { roi, pixels })
    }
}

fn coordinate(v: i64) -> Result<i32, GeometryError> {
    i32::try_from(v).map_err(|_| GeometryError)
}
