//! # maintwatch-core
//!
//! **Turn raw machine telemetry into a maintenance decision.**
//!
//! `maintwatch-core` samples vibration, temperature and pressure readings,
//! summarises a rolling time window into a fixed feature vector, and serves
//! a binary "maintenance needed" decision from an externally trained
//! classifier artifact.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use maintwatch_core::{
//!     Clock, FeatureAggregator, InferenceService, SystemClock, TelemetryHub,
//!     model::load_artifact, samplers::SyntheticSampler,
//! };
//!
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let hub = TelemetryHub::new(
//!     Box::new(SyntheticSampler::new(clock.clone())),
//!     FeatureAggregator::new(Duration::from_secs(60), clock),
//! );
//! let service = InferenceService::new(
//!     load_artifact("models/maintenance_forest.json".as_ref()).unwrap(),
//! )
//! .unwrap();
//!
//! hub.poll().unwrap();
//! let features = hub.current_features().unwrap();
//! let decision = service.predict(&features).unwrap();
//! println!("maintenance needed: {}", decision.maintenance_needed);
//! ```
//!
//! ## Architecture
//!
//! Sampler → Aggregator (rolling window) → FeatureVector → InferenceService
//!
//! Every source implements the [`SensorSampler`] trait. The [`TelemetryHub`]
//! polls one sampler into one [`FeatureAggregator`]; the [`InferenceService`]
//! owns the loaded [`model::Classifier`] and refuses to answer once the
//! artifact has failed until it is reloaded.

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod error;
pub mod features;
pub mod hub;
pub mod inference;
pub mod model;
pub mod reading;
pub mod sampler;
pub mod samplers;
pub mod session;

pub use aggregator::{FeatureAggregator, IngestOutcome, WindowSnapshot, compute_features};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MonitorConfig;
pub use error::{
    ArtifactError, ConfigError, FieldIssue, FieldProblem, InferenceError, InsufficientData,
    SensorUnavailable, SessionError,
};
pub use features::{FEATURE_COUNT, FEATURE_LAYOUT, FeatureVector, LayoutInfo};
pub use hub::{HubHealth, TelemetryHub};
pub use inference::{InferenceService, PredictionResult, ServiceStatus};
pub use reading::{Channel, Reading};
pub use sampler::{SamplerInfo, SamplerKind, SamplerState, SensorSampler};
pub use session::{
    MachineInfo, SessionConfig, SessionMeta, SessionWriter, detect_machine_info,
    load_session_meta, load_session_readings,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
