//! Text exposition
//!
//! Samples produced by a cycle carry per-resource label sets, which the
//! typed `prometheus` vectors cannot express, so they are converted to raw
//! metric families and encoded alongside the static registry.

use super::sink::Sample;
use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Renders scrapes together with process-level metrics
pub struct Exposition {
    registry: Registry,
}

impl Exposition {
    pub fn new(version: &str) -> prometheus::Result<Self> {
        let registry = Registry::new();

        let build_info = IntGaugeVec::new(
            Opts::new(
                "azure_health_exporter_build_info",
                "A metric with a constant '1' value labeled by version of azure-health-exporter",
            ),
            &["version"],
        )?;
        registry.register(Box::new(build_info.clone()))?;
        build_info.with_label_values(&[version]).set(1);

        Ok(Self { registry })
    }

    /// Encode registry metrics followed by `samples`
    pub fn render(&self, samples: &[Sample]) -> prometheus::Result<String> {
        let mut families = self.registry.gather();
        families.extend(families_from_samples(samples));

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Group samples into gauge families, in order of first appearance
pub fn families_from_samples(samples: &[Sample]) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();

    for sample in samples {
        let position = match families.iter().position(|f| f.get_name() == sample.name) {
            Some(position) => position,
            None => {
                let mut family = MetricFamily::default();
                family.set_name(sample.name.to_string());
                family.set_help(sample.help.to_string());
                family.set_field_type(MetricType::GAUGE);
                families.push(family);
                families.len() - 1
            }
        };

        families[position].mut_metric().push(to_metric(sample));
    }

    families
}

fn to_metric(sample: &Sample) -> Metric {
    let mut metric = Metric::default();

    for (name, value) in &sample.labels {
        let mut pair = LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value(value.clone());
        metric.mut_label().push(pair);
    }

    let mut gauge = Gauge::default();
    gauge.set_value(sample.value);
    metric.set_gauge(gauge);

    metric
}
