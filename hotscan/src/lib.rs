//! Screenshot-to-build detection.
//!
//! Turns a raw screenshot into a structured list of detected characters,
//! weapons, items and tomes with confidence scores, by combining grid-cell
//! template matching against catalog icons with externally produced text
//! detections.

pub mod config;
pub mod detection;
pub mod detector;
pub mod feedback;
pub mod fuse;
pub mod matcher;
pub mod metrics;
pub mod ocr;
pub mod score;
pub mod store;

pub use config::{Algorithm, CandidateFilter, Strategy, ThresholdTable, Thresholds};
pub use detection::{AggregatedDetection, DetectedBuild, Detection, DetectionMethod};
pub use detector::{Detector, ProgressFn, load_templates};
pub use feedback::FeedbackBook;
pub use matcher::Matcher;
pub use metrics::{MetricsSink, NullMetrics, Phase};
pub use ocr::{OcrDetection, OcrScan, OcrSource};
pub use store::{DirIconLoader, IconLoader, MemoryIconLoader, Template, TemplateStore};
