//! Seams to the inference engines.
//!
//! The frame processor only ever talks to these traits, so the whole
//! extraction and validation path runs the same against a real model or a
//! scripted stand-in.

use image::RgbImage;

use crate::binarize::BinaryImage;
use crate::error::LprError;
use crate::region::Detection;
use crate::text::TextGroup;

pub trait Detector {
    /// Candidate plate boxes for one frame.
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, LprError>;
}

pub trait Recognizer {
    /// `Ok(None)` when the engine found no text at all.
    fn recognize(&mut self, image: &BinaryImage) -> Result<Option<Vec<TextGroup>>, LprError>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, LprError> {
        (**self).detect(frame)
    }
}

impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    fn recognize(&mut self, image: &BinaryImage) -> Result<Option<Vec<TextGroup>>, LprError> {
        (**self).recognize(image)
    }
}
