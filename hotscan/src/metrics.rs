//! Observational hooks for the hosting application's telemetry.
//!
//! The pipeline reports phase boundaries and final detection statistics; it
//! never reads anything back, so sinks must be cheap and infallible.

/// Coarse pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
	Load,
	Preprocess,
	Match,
	Postprocess,
}

pub trait MetricsSink {
	#[allow(unused_variables)]
	fn phase_started(&self, phase: Phase) {}

	#[allow(unused_variables)]
	fn phase_finished(&self, phase: Phase) {}

	#[allow(unused_variables)]
	fn record_detections(&self, count: usize, avg_confidence: f32) {}
}

/// Default sink: discards everything.
pub struct NullMetrics;

impl MetricsSink for NullMetrics {}
