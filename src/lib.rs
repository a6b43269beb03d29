use image::RgbImage;
use log::{ debug, error, info, warn };

use std::time::{ Duration, Instant };

use annotate::Annotator;
use binarize::binarize;
use config::Config;
use engine::{ Detector, Recognizer };
use region::{ Detection, RegionExtractor };
use report::{ PlateEvent, ReportSink, Verdict };
use source::{ FrameRead, FrameSource };
use text::TextAggregator;
use validator::PlateValidator;

pub mod annotate;
pub mod binarize;
pub mod config;
pub mod engine;
pub mod error;
pub mod region;
pub mod report;
pub mod source;
pub mod text;
pub mod utils;
pub mod validator;
#[cfg(feature = "tf-engine")]
pub mod tf;


/// What happened to the detections of one frame, or of a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    pub detections: usize,
    pub below_threshold: usize,
    pub geometry_skipped: usize,
    pub no_text: usize,
    pub engine_errors: usize,
    pub valid: usize,
    pub invalid: usize,
}

impl FrameSummary {
    fn absorb(&mut self, other: &FrameSummary) {
        self.detections += other.detections;
        self.below_threshold += other.below_threshold;
        self.geometry_skipped += other.geometry_skipped;
        self.no_text += other.no_text;
        self.engine_errors += other.engine_errors;
        self.valid += other.valid;
        self.invalid += other.invalid;
    }
}

/// Result of one frame: its counters, the detections that passed the
/// acceptance threshold and every verdict in detection order.
#[derive(Debug, Default, Clone)]
pub struct FrameOutcome {
    pub summary: FrameSummary,
    pub accepted: Vec<Detection>,
    pub events: Vec<PlateEvent>,
}

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub frames: u64,
    pub missed_reads: u64,
    pub totals: FrameSummary,
    pub elapsed: Duration,
}

/// The per-frame plate pipeline: detect, crop, binarize, recognize, validate, report.
pub struct FrameProcessor<D, R> {
    detector: D,
    recognizer: R,
    acceptance_threshold: f32,
    extractor: RegionExtractor,
    aggregator: TextAggregator,
    validator: PlateValidator,
}

impl<D: Detector, R: Recognizer> FrameProcessor<D, R> {

    pub fn new(detector: D, recognizer: R, config: &Config) -> Self {
        Self {
            detector,
            recognizer,
            acceptance_threshold: config.detection.acceptance_threshold,
            extractor: RegionExtractor::new(&config.region),
            aggregator: TextAggregator::new(&config.noise),
            validator: PlateValidator::new(config.regions(), &config.noise),
        }
    }

    pub fn validator(&self) -> &PlateValidator {
        &self.validator
    }

    /// Runs one frame to completion. Every verdict goes to `sink` as soon as
    /// it exists and is also returned.
    pub fn process_frame(&mut self, frame_index: u64, frame: &RgbImage, sink: &mut dyn ReportSink) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();
        let FrameOutcome { summary, accepted, events } = &mut outcome;

        let detections = match self.detector.detect(frame) {
            Ok(detections) => detections,
            Err(e) => {
                error!("frame {}: detection failed: {}", frame_index, e);
                summary.engine_errors += 1;
                return outcome;
            }
        };
        summary.detections = detections.len();

        for detection in &detections {
            if detection.confidence < self.acceptance_threshold {
                summary.below_threshold += 1;
                continue;
            }
            accepted.push(*detection);
            self.process_detection(frame_index, frame, detection, sink, summary, events);
        }
        outcome
    }

    fn process_detection(&mut self, frame_index: u64, frame: &RgbImage, detection: &Detection,
                         sink: &mut dyn ReportSink, summary: &mut FrameSummary, events: &mut Vec<PlateEvent>) {
        let crop = match self.extractor.extract(frame, detection) {
            Ok(crop) => crop,
            Err(_) => {
                debug!("frame {}: degenerate box {:?}", frame_index, detection);
                summary.geometry_skipped += 1;
                return;
            }
        };
        let binary = binarize(&crop.pixels);

        let groups = match self.recognizer.recognize(&binary) {
            Ok(Some(groups)) => groups,
            Ok(None) => {
                debug!("frame {}: no text in {:?}", frame_index, crop.roi);
                summary.no_text += 1;
                return;
            }
            Err(e) => {
                error!("frame {}: recognition failed for {:?}: {}", frame_index, crop.roi, e);
                summary.engine_errors += 1;
                return;
            }
        };

        for candidate in self.aggregator.aggregate(&groups) {
            let verdict = Verdict::from(self.validator.validate(&candidate));
            if verdict.is_valid() {
                summary.valid += 1;
            } else {
                summary.invalid += 1;
            }
            let event = PlateEvent { frame: frame_index, roi: crop.roi, confidence: detection.confidence, verdict };
            if let Err(e) = sink.report(&event) {
                warn!("frame {}: reporting failed: {}", frame_index, e);
            }
            events.push(event);
        }
    }

    /// Pulls frames until the source runs dry. Missed reads are skipped
    /// without counting as a frame.
    pub fn run(&mut self, source: &mut dyn FrameSource, sink: &mut dyn ReportSink, annotator: Option<&Annotator>) -> RunSummary {
        let mut run = RunSummary::default();
        let started = Instant::now();
        loop {
            let frame = match source.read() {
                FrameRead::Frame(frame) => frame,
                FrameRead::Missed => {
                    run.missed_reads += 1;
                    continue;
                }
                FrameRead::Exhausted => break,
            };
            let frame_index = run.frames;
            let frame_started = Instant::now();
            let outcome = self.process_frame(frame_index, &frame, sink);
            if let Some(annotator) = annotator {
                if let Err(e) = annotator.save(frame_index, &frame, &outcome.accepted, &outcome.events) {
                    warn!("frame {}: annotation failed: {}", frame_index, e);
                }
            }
            let spent = frame_started.elapsed().as_secs_f64();
            if spent > 0.0 {
                debug!("frame {}: {:.1} ms, {:.2} fps", frame_index, spent * 1000.0, 1.0 / spent);
            }
            run.totals.absorb(&outcome.summary);
            run.frames += 1;
        }
        run.elapsed = started.elapsed();
        info!("{} frames ({} missed reads) in {:.2?}: {} valid, {} invalid, {} skipped boxes",
            run.frames, run.missed_reads, run.elapsed, run.totals.valid, run.totals.invalid,
            run.totals.below_threshold + run.totals.geometry_skipped + run.totals.no_text);
        run
    }
}


#[cfg(test)]
mod test {

    use image::{ Rgb, RgbImage };

    use crate::binarize::BinaryImage;
    use crate::config::Config;
    use crate::engine::{ Detector, Recognizer };
    use crate::error::LprError;
    use crate::region::{ Detection, RegionOfInterest };
    use crate::report::{ MemorySink, Verdict };
    use crate::source::{ FrameRead, FrameSource };
    use crate::text::{ RecognitionLine, TextGroup };
    use crate::validator::RejectReason;

    use super::{ FrameOutcome, FrameProcessor };

    use std::collections::VecDeque;

    struct FixedDetector(Result<Vec<Detection>, ()>);

    impl Detector for FixedDetector {
        fn detect(&mut self, _: &RgbImage) -> Result<Vec<Detection>, LprError> {
            self.0.clone().map_err(|_| LprError::engine("detector down"))
        }
    }

    /// Replays scripted results and remembers the size of every image it saw.
    #[derive(Default)]
    struct ScriptedRecognizer {
        script: VecDeque<Result<Option<Vec<TextGroup>>, LprError>>,
        seen: Vec<(u32, u32)>,
    }

    impl ScriptedRecognizer {
        fn then(mut self, groups: &[&[&str]]) -> Self {
            let groups = groups.iter()
                .map(|lines| lines.iter().map(|t| RecognitionLine::new(*t, 0.9)).collect())
                .collect();
            self.script.push_back(Ok(Some(groups)));
            self
        }

        fn then_nothing(mut self) -> Self {
            self.script.push_back(Ok(None));
            self
        }

        fn then_fail(mut self) -> Self {
            self.script.push_back(Err(LprError::engine("ocr down")));
            self
        }
    }

    impl Recognizer for ScriptedRecognizer {
        fn recognize(&mut self, image: &BinaryImage) -> Result<Option<Vec<TextGroup>>, LprError> {
            assert!(image.as_raw().iter().all(|v| *v == 0 || *v == 255));
            self.seen.push(image.dimensions());
            self.script.pop_front().unwrap_or(Ok(None))
        }
    }

    fn frame() -> RgbImage {
        RgbImage::from_fn(320, 240, |x, y| if (x / 7 + y / 5) % 3 == 0 { Rgb([20, 20, 20]) } else { Rgb([230, 230, 230]) })
    }

    fn valid(region: &str, numeric: &str, suffix: &str) -> Verdict {
        Verdict::Valid { region: region.into(), numeric: numeric.into(), suffix: suffix.into() }
    }

    #[test]
    fn reports_each_group_of_each_accepted_detection() {
        let detector = FixedDetector(Ok(vec![
            Detection::new(10, 10, 110, 50, 0.95),
            Detection::new(150, 100, 250, 140, 0.5),
            Detection::new(20, 150, 120, 190, 0.8),
        ]));
        let recognizer = ScriptedRecognizer::default()
            .then(&[&["B 1234", "XY"]])
            .then(&[&["IAA12C"], &["XX1234AB"], &[" "]]);
        let mut processor = FrameProcessor::new(detector, recognizer, &Config::default());
        let mut sink = MemorySink::default();

        let outcome = processor.process_frame(4, &frame(), &mut sink);
        let (summary, events) = (outcome.summary, outcome.events);

        assert_eq!(summary.detections, 3);
        assert_eq!(summary.below_threshold, 1);
        assert_eq!(outcome.accepted, vec![
            Detection::new(10, 10, 110, 50, 0.95),
            Detection::new(20, 150, 120, 190, 0.8),
        ]);
        assert_eq!(summary.valid, 2);
        assert_eq!(summary.invalid, 1);
        assert_eq!(events, sink.events);
        let verdicts: Vec<&Verdict> = events.iter().map(|e| &e.verdict).collect();
        assert_eq!(verdicts, vec![
            &valid("B", "1234", "XY"),
            &valid("AA", "12", "C"),
            &Verdict::Invalid { reason: RejectReason::InvalidRegion, raw: "XX1234AB".into() },
        ]);
        assert_eq!(events[0].frame, 4);
        assert_eq!(events[0].roi, RegionOfInterest { x1: 10, y1: 10, x2: 109, y2: 38 });
        assert_eq!(events[1].confidence, 0.8);
        // 100x40 box -> 99x28 crop
        assert_eq!(processor.recognizer.seen, vec![(99, 28), (99, 28)]);
    }

    #[test]
    fn skips_are_silent() {
        let detector = FixedDetector(Ok(vec![
            Detection::new(50, 50, 50, 90, 0.99),
            Detection::new(400, 300, 500, 340, 0.99),
            Detection::new(10, 10, 110, 50, 0.99),
            Detection::new(10, 60, 110, 100, 0.99),
        ]));
        let recognizer = ScriptedRecognizer::default().then_nothing().then_fail();
        let mut processor = FrameProcessor::new(detector, recognizer, &Config::default());
        let mut sink = MemorySink::default();

        let FrameOutcome { summary, accepted, events } = processor.process_frame(0, &frame(), &mut sink);

        assert_eq!(summary.geometry_skipped, 2);
        assert_eq!(summary.no_text, 1);
        assert_eq!(summary.engine_errors, 1);
        // boxes that read no text are still accepted detections
        assert_eq!(accepted.len(), 4);
        assert!(events.is_empty());
        assert!(sink.events.is_empty());
    }

    #[test]
    fn detector_failure_ends_only_that_frame() {
        let mut processor = FrameProcessor::new(FixedDetector(Err(())), ScriptedRecognizer::default(), &Config::default());
        let mut sink = MemorySink::default();
        let FrameOutcome { summary, accepted, events } = processor.process_frame(0, &frame(), &mut sink);
        assert_eq!(summary.engine_errors, 1);
        assert!(accepted.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn acceptance_threshold_and_region_codes_come_from_config() {
        let mut config = Config::default();
        config.detection.acceptance_threshold = 0.4;
        config.region_codes = Some(vec!["XX".to_string()]);
        let detector = FixedDetector(Ok(vec![Detection::new(10, 10, 110, 50, 0.5)]));
        let recognizer = ScriptedRecognizer::default().then(&[&["XX1234AB"], &["B1234XY"]]);
        let mut processor = FrameProcessor::new(detector, recognizer, &config);
        let mut sink = MemorySink::default();

        let summary = processor.process_frame(0, &frame(), &mut sink).summary;

        assert_eq!(summary.valid, 1);
        assert_eq!(sink.events[0].verdict, valid("XX", "1234", "AB"));
        assert_eq!(sink.events[1].verdict, Verdict::Invalid { reason: RejectReason::InvalidRegion, raw: "B1234XY".into() });
    }

    struct Frames(VecDeque<FrameRead>);

    impl FrameSource for Frames {
        fn read(&mut self) -> FrameRead {
            self.0.pop_front().unwrap_or(FrameRead::Exhausted)
        }
    }

    #[test]
    fn run_drains_source_and_skips_missed_reads() {
        let detector = FixedDetector(Ok(vec![Detection::new(10, 10, 110, 50, 0.9)]));
        let recognizer = ScriptedRecognizer::default()
            .then(&[&["B1234XY"]])
            .then(&[&["AD1C"]]);
        let mut processor = FrameProcessor::new(detector, recognizer, &Config::default());
        let mut source = Frames(vec![
            FrameRead::Frame(frame()),
            FrameRead::Missed,
            FrameRead::Frame(frame()),
        ].into());
        let mut sink = MemorySink::default();

        let run = processor.run(&mut source, &mut sink, None);

        assert_eq!(run.frames, 2);
        assert_eq!(run.missed_reads, 1);
        assert_eq!(run.totals.valid, 2);
        let frames: Vec<u64> = sink.events.iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![0, 1]);
        assert_eq!(sink.events[1].verdict, valid("AD", "1", "C"));
    }
}
