// THEORY:
// This file is the main entry point for the `sage_vision` library crate.
// It defines the public API that external consumers (a dashboard server, a
// capture loop, a replay tool) build on.
//
// The primary export is `Engine`: feed it one `FrameInput` per camera frame and
// it returns a fused `LearningState`, while keeping the analytics series and
// the alert list that `report`, `current_snapshot` and `export_session` read.
// `EngineService` wraps the same engine for async, multi-task callers. The
// per-modality analyzers and scoring rules live in `core_modules` and are public
// for callers that want to run one stage in isolation.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod simulation;
pub mod stream_pipeline;

pub use config::EngineConfig;
pub use core_modules::alerts::{Alert, AlertKind, Severity};
pub use core_modules::analytics::{AnalyticsOutcome, AnalyticsReport, TrendAnalysis};
pub use core_modules::fusion::{AccessibilityAssessment, DerivedScores, LearningState};
pub use core_modules::landmarks::{EmotionLabel, EmotionReading, EmotionVector, FaceLandmarks, HandLandmarks, LandmarkPoint};
pub use core_modules::utils::clock::{Clock, ManualClock, SystemClock};
pub use error::{CollaboratorError, ConfigError, EngineError};
pub use pipeline::{Engine, FrameInput, FrameResult, Observation};
pub use session::{SessionExport, SessionSnapshot, SessionView};
pub use simulation::{StopFlag, SyntheticFrames, simulate_demo_data};
pub use stream_pipeline::EngineService;
