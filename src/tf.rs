//! TensorFlow frozen-graph engines.

use tensorflow::{ Tensor, Session, SessionOptions, Graph, SessionRunArgs, ImportGraphDefOptions };
use image::{ RgbImage, imageops::{ self, FilterType } };
use log::{ debug, info, warn };

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use crate::binarize::BinaryImage;
use crate::config::{ Acceleration, DetectionConfig, Precision, RecognitionConfig };
use crate::engine::{ Detector, Recognizer };
use crate::error::LprError;
use crate::region::Detection;
use crate::text::TextGroup;
use crate::utils;

// serialized ConfigProto { device_count { key: "GPU" value: 0 } }
const CPU_ONLY_CONFIG: [u8; 9] = [0x0a, 0x07, 0x0a, 0x03, b'G', b'P', b'U', 0x10, 0x00];

struct FrozenGraph {
    graph: Graph,
    session: Session,
}

impl FrozenGraph {

    fn load(pb_file: impl AsRef<Path>, acceleration: Acceleration) -> Result<Self, LprError> {
        let pb_path = pb_file.as_ref();
        let mut pb_file = File::open(pb_path)?;
        let mut pb = Vec::new();
        pb_file.read_to_end(&mut pb)?;
        // import graph def
        let mut graph = Graph::new();
        let graph_def_options = ImportGraphDefOptions::new();
        graph.import_graph_def(&pb, &graph_def_options)?;
        // new session
        let mut session_option = SessionOptions::new();
        if acceleration == Acceleration::Cpu {
            session_option.set_config(&CPU_ONLY_CONFIG)?;
        }
        let session = Session::new(&session_option, &graph)?;
        info!("loaded {} ({:?})", pb_path.display(), acceleration);
        Ok(Self { graph, session })
    }
}

/// Plate detector exported with the object detection API: takes a uint8
/// image, returns normalized `[ymin, xmin, ymax, xmax]` boxes and scores.
pub struct TfDetector {
    model: FrozenGraph,
    input_name: String,
    boxes_name: String,
    scores_name: String,
    confidence_floor: f32,
}

impl TfDetector {

    pub fn new(config: &DetectionConfig) -> Result<Self, LprError> {
        let model = FrozenGraph::load(&config.model_path, config.acceleration)?;
        Ok(Self {
            model,
            input_name: config.input_name.clone(),
            boxes_name: config.boxes_name.clone(),
            scores_name: config.scores_name.clone(),
            confidence_floor: config.confidence_floor,
        })
    }

    /// get detection result
    /// return (boxes, scores)
    fn run(&self, input: &Tensor<u8>) -> Result<(Tensor<f32>, Tensor<f32>), LprError> {
        let graph = &self.model.graph;
        let mut args = SessionRunArgs::new();
        args.add_feed(&graph.operation_by_name_required(&self.input_name)?, 0, input);
        let box_token = args.request_fetch(&graph.operation_by_name_required(&self.boxes_name)?, 0);
        let scores_token = args.request_fetch(&graph.operation_by_name_required(&self.scores_name)?, 0);
        self.model.session.run(&mut args)?;
        let boxes: Tensor<f32> = args.fetch(box_token)?;
        let scores: Tensor<f32> = args.fetch(scores_token)?;
        Ok((boxes, scores))
    }
}

impl Detector for TfDetector {

    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, LprError> {
        let (width, height) = frame.dimensions();
        let img_tensor = Tensor::new(&[1, height as u64, width as u64, 3]);
        let img_tensor = img_tensor.with_values(frame.as_raw())?;

        let (boxes, scores) = self.run(&img_tensor)?;
        let (width, height) = (width as f32, height as f32);
        let detections: Vec<Detection> = boxes.chunks(4).zip(scores.iter())
            .filter(|(_, score)| **score >= self.confidence_floor)
            .map(|(v, score)| {
                let y1 = (v[0] * height) as i32;
                let x1 = (v[1] * width) as i32;
                let y2 = (v[2] * height) as i32;
                let x2 = (v[3] * width) as i32;
                Detection::new(x1, y1, x2, y2, *score)
            })
            .collect();
        debug!("detector kept {} of {} boxes", detections.len(), scores.len());
        Ok(detections)
    }
}

/// Sequence recognizer: image in, one row of class scores per time step out.
pub struct TfRecognizer {
    model: FrozenGraph,
    input_name: String,
    output_name: String,
    charset: Vec<char>,
    input_size: [u32; 2],
    output_shape: [usize; 2],
}

impl TfRecognizer {

    pub fn new(config: &RecognitionConfig) -> Result<Self, LprError> {
        if config.precision == Precision::Fp16 {
            warn!("frozen graphs run at the precision they were exported with, fp16 request ignored");
        }
        let model = FrozenGraph::load(&config.model_path, config.acceleration)?;
        Ok(Self {
            model,
            input_name: config.input_name.clone(),
            output_name: config.output_name.clone(),
            charset: config.charset.chars().collect(),
            input_size: config.input_size,
            output_shape: config.output_shape,
        })
    }

    fn run(&self, input: &Tensor<f32>) -> Result<Tensor<f32>, LprError> {
        let graph = &self.model.graph;
        let mut args = SessionRunArgs::new();
        args.add_feed(&graph.operation_by_name_required(&self.input_name)?, 0, input);
        let res = args.request_fetch(&graph.operation_by_name_required(&self.output_name)?, 0);
        self.model.session.run(&mut args)?;
        let res: Tensor<f32> = args.fetch(res)?;
        Ok(res)
    }
}

impl Recognizer for TfRecognizer {

    fn recognize(&mut self, image: &BinaryImage) -> Result<Option<Vec<TextGroup>>, LprError> {
        let [width, height] = self.input_size;
        let resized = imageops::resize(image, width, height, FilterType::Nearest);
        // the model was trained on three channel input
        let values: Vec<f32> = resized.as_raw().iter()
            .flat_map(|v| std::iter::repeat(*v as f32).take(3))
            .collect();
        let tensor: Tensor<f32> = Tensor::new(&[1, height as u64, width as u64, 3]);
        let tensor = tensor.with_values(&values)?;

        let scores = self.run(&tensor)?;
        let expected = self.output_shape[0] * self.output_shape[1];
        if scores.len() < expected {
            return Err(LprError::engine(format!(
                "recognizer produced {} scores, expected {:?}", scores.len(), self.output_shape)));
        }
        let line = utils::fast_decode(&scores, self.output_shape, &self.charset);
        if line.text.is_empty() {
            return Ok(None);
        }
        Ok(Some(vec![vec![line]]))
    }
}
