//! Metric sink
//!
//! A cycle writes gauges and at most one invalid-metric signal into a
//! [`MetricSink`]. [`Scrape`] is the buffering sink used per HTTP scrape.

use crate::error::Error;
use crate::resource::LabelSet;

/// One gauge value
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: LabelSet,
    pub value: f64,
}

/// Receives the output of a collection cycle
pub trait MetricSink: Send {
    fn gauge(&mut self, sample: Sample);

    /// Signal that the cycle failed
    fn invalid(&mut self, error: Error);
}

/// Buffers one scrape: either samples or the first error, never both
#[derive(Debug, Default)]
pub struct Scrape {
    samples: Vec<Sample>,
    error: Option<Error>,
}

impl Scrape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_result(self) -> Result<Vec<Sample>, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.samples),
        }
    }
}

impl MetricSink for Scrape {
    fn gauge(&mut self, sample: Sample) {
        if self.error.is_none() {
            self.samples.push(sample);
        }
    }

    fn invalid(&mut self, error: Error) {
        if self.error.is_none() {
            self.samples.clear();
            self.error = Some(error);
        }
    }
}
