//! Pipeline configuration.
//!
//! Everything has a default, so a config file only needs the keys it wants to
//! change. Command line flags in `main.rs` override the loaded values.

use serde::{ Deserialize, Serialize };

use std::fs;
use std::path::{ Path, PathBuf };

use crate::error::LprError;
use crate::validator::RegionCodes;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub recognition: RecognitionConfig,
    pub region: RegionConfig,
    pub noise: NoiseConfig,
    /// replaces the built-in region code table when set
    pub region_codes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Acceleration {
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Fp32,
    Fp16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub model_path: PathBuf,
    /// the detector drops anything scoring below this
    pub confidence_floor: f32,
    /// the frame processor only extracts detections at or above this
    pub acceptance_threshold: f32,
    pub acceleration: Acceleration,
    pub input_name: String,
    pub boxes_name: String,
    pub scores_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub model_path: PathBuf,
    pub acceleration: Acceleration,
    pub precision: Precision,
    /// classes the model emits, in output order; the class after the last one is blank
    pub charset: String,
    /// [width, height] the binary image is resized to
    pub input_size: [u32; 2],
    /// [time steps, classes]
    pub output_shape: [usize; 2],
    pub input_name: String,
    pub output_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub height_ratio: f64,
    pub width_ratio: f64,
}

/// Glyphs the recognizer tends to hallucinate at the edges of a plate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub leading: Vec<char>,
    pub trailing_suffix: Vec<char>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/plate_detect.pb"),
            confidence_floor: 0.8,
            acceptance_threshold: 0.8,
            acceleration: Acceleration::Gpu,
            input_name: "image_tensor".to_string(),
            boxes_name: "detection_boxes".to_string(),
            scores_name: "detection_scores".to_string(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/plate_ocr.pb"),
            acceleration: Acceleration::Gpu,
            precision: Precision::Fp32,
            charset: "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string(),
            input_size: [164, 48],
            output_shape: [18, 37],
            input_name: "input_1".to_string(),
            output_name: "dense_2/truediv".to_string(),
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self { height_ratio: 0.7, width_ratio: 0.99 }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            leading: vec!['I', '1'],
            trailing_suffix: vec!['I'],
        }
    }
}

impl Config {

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LprError> {
        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.check()?;
        Ok(config)
    }

    /// Region codes in effect: the configured list, or the built-in table.
    pub fn regions(&self) -> RegionCodes {
        match &self.region_codes {
            Some(codes) => RegionCodes::new(codes.iter().cloned()),
            None => RegionCodes::indonesian().clone(),
        }
    }

    /// Rejects values the pipeline cannot work with.
    pub fn check(&self) -> Result<(), LprError> {
        let region = &self.region;
        for (name, ratio) in [("height_ratio", region.height_ratio), ("width_ratio", region.width_ratio)].iter() {
            if !(*ratio > 0.0 && *ratio <= 1.0) {
                return Err(LprError::config(format!("{} must be in (0, 1], got {}", name, ratio)));
            }
        }
        let threshold = self.detection.acceptance_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(LprError::config(format!("acceptance_threshold must be in [0, 1], got {}", threshold)));
        }
        let recognition = &self.recognition;
        if recognition.output_shape[1] <= recognition.charset.chars().count() {
            return Err(LprError::config("output_shape has no room for the blank class"));
        }
        if let Some(codes) = &self.region_codes {
            if let Some(bad) = codes.iter().find(|c| c.is_empty() || c.chars().count() > 2) {
                return Err(LprError::config(format!("region code {:?} must be 1 or 2 characters", bad)));
            }
        }
        Ok(())
    }
}
