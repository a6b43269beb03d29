//! Where plate verdicts go.

use log::{ info, warn };
use serde::Serialize;

use std::io::Write;
use std::time::Duration;

use crate::error::LprError;
use crate::region::RegionOfInterest;
use crate::validator::{ RejectReason, Rejection, ValidatedPlate };

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Verdict {
    Valid {
        region: String,
        numeric: String,
        suffix: String,
    },
    Invalid {
        reason: RejectReason,
        raw: String,
    },
}

impl From<Result<ValidatedPlate, Rejection>> for Verdict {
    fn from(result: Result<ValidatedPlate, Rejection>) -> Self {
        match result {
            Ok(ValidatedPlate { region, numeric, suffix }) => Verdict::Valid { region, numeric, suffix },
            Err(Rejection { reason, original }) => Verdict::Invalid { reason, raw: original },
        }
    }
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid { .. })
    }

    /// Plate text as printed on the plate, e.g. `B 1234 XY`.
    pub fn plate_text(&self) -> Option<String> {
        match self {
            Verdict::Valid { region, numeric, suffix } => Some(format!("{} {} {}", region, numeric, suffix)),
            Verdict::Invalid { .. } => None,
        }
    }
}

/// One verdict for one text group of one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateEvent {
    pub frame: u64,
    pub roi: RegionOfInterest,
    pub confidence: f32,
    #[serde(flatten)]
    pub verdict: Verdict,
}

pub trait ReportSink {
    fn report(&mut self, event: &PlateEvent) -> Result<(), LprError>;
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn report(&mut self, event: &PlateEvent) -> Result<(), LprError> {
        (**self).report(event)
    }
}

/// Valid plates at info, rejects at warn.
#[derive(Debug, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn report(&mut self, event: &PlateEvent) -> Result<(), LprError> {
        match &event.verdict {
            Verdict::Valid { region, numeric, suffix } => {
                info!("frame {}: plate valid: {} {} {}", event.frame, region, numeric, suffix)
            }
            Verdict::Invalid { reason, raw } => {
                warn!("frame {}: plate invalid ({}): {}", event.frame, reason, raw)
            }
        }
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonLinesSink<W> {
    fn report(&mut self, event: &PlateEvent) -> Result<(), LprError> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct PlatPayload<'a> {
    plat: &'a str,
}

/// POSTs every valid plate to an HTTP endpoint as `{"plat": "B 1234 XY"}`.
/// Rejects are not sent.
pub struct HttpSink {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>) -> Result<Self, LprError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { client, url: url.into() })
    }
}

impl ReportSink for HttpSink {
    fn report(&mut self, event: &PlateEvent) -> Result<(), LprError> {
        let text = match event.verdict.plate_text() {
            Some(text) => text,
            None => return Ok(()),
        };
        self.client
            .post(&self.url)
            .json(&PlatPayload { plat: &text })
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

/// Keeps every event, for tests and for callers that want the whole batch.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<PlateEvent>,
}

impl ReportSink for MemorySink {
    fn report(&mut self, event: &PlateEvent) -> Result<(), LprError> {
        self.events.push(event.clone());
        Ok(())
    }
}

/// Sends every event to each inner sink; the first failure is returned
/// after all sinks have seen the event.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl FanOut {
    pub fn push(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }
}

impl ReportSink for FanOut {
    fn report(&mut self, event: &PlateEvent) -> Result<(), LprError> {
        let mut first_err = None;
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.report(event) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
