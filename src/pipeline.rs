// THEORY:
// The `pipeline` module is the top-level API of the engine. `Engine` owns every
// piece of per-session state (the three trackers, the raw sample buffers, the
// analytics series and the alert list) and is the only thing that mutates it.
//
// A frame flows through four stages:
//   1. Per-modality analysis: eye, head and hand trackers update their buffers
//      and report metrics, or nothing if their input was absent this frame.
//   2. Fusion: the emotion reading and the available metrics become a
//      `LearningState`.
//   3. Derived scores: ADHD risk, visual strain and cognitive load.
//   4. Recording: one analytics point is appended and the alert monitor runs.
//
// `process_frame` takes `&mut self`, so the borrow checker enforces the single
// writer rule. Queries (`report`, `trend_analysis`, snapshots) take `&self` and
// read "now" from the injected clock.

use crate::config::EngineConfig;
use crate::core_modules::alerts::{Alert, AlertMonitor};
use crate::core_modules::analytics::{
    AnalyticsOutcome, AnalyticsPoint, AnalyticsSeries, AttentionSample, EmotionSample, ReportContext,
    TrendAnalysis, analyze_trend, build_report,
};
use crate::core_modules::eye_tracker::{EyeMetrics, EyeTracker};
use crate::core_modules::fusion::{
    AssessmentContext, DerivedScores, FusionInputs, LearningState, StateFusion, motor_precision_or_full,
};
use crate::core_modules::hand_tracker::{HandMetrics, HandTracker};
use crate::core_modules::head_tracker::{HeadMetrics, HeadTracker};
use crate::core_modules::history::HistoryBuffer;
use crate::core_modules::landmarks::{EmotionReading, FaceLandmarks, HandLandmarks};
use crate::core_modules::utils::clock::{Clock, SystemClock, window_start};
use crate::error::ConfigError;
use crate::session::{SessionExport, SessionSnapshot, SessionView};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Default horizon of `trend_analysis`, in minutes.
pub const DEFAULT_TREND_WINDOW_MINUTES: f64 = 5.0;

/// Everything the collaborators produced for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    pub timestamp: DateTime<Utc>,
    pub emotion: EmotionReading,
    /// `None` when no face was detected.
    pub face: Option<FaceLandmarks>,
    pub hands: Vec<HandLandmarks>,
    /// Normalized distance to the screen, when the caller can estimate it.
    pub screen_distance: Option<f64>,
}

impl FrameInput {
    pub fn new(emotion: EmotionReading, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            emotion,
            face: None,
            hands: Vec::new(),
            screen_distance: None,
        }
    }

    pub fn with_face(mut self, face: FaceLandmarks) -> Self {
        self.face = Some(face);
        self
    }

    pub fn with_hands(mut self, hands: Vec<HandLandmarks>) -> Self {
        self.hands = hands;
        self
    }

    pub fn with_screen_distance(mut self, distance: f64) -> Self {
        self.screen_distance = Some(distance);
        self
    }
}

/// Raw per-modality metrics of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FrameMetrics {
    pub eye: Option<EyeMetrics>,
    pub head: Option<HeadMetrics>,
    pub hand: Option<HandMetrics>,
}

/// The full outcome of processing one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub learning_state: LearningState,
    pub metrics: FrameMetrics,
    pub scores: DerivedScores,
    /// Alerts raised by this frame.
    pub new_alerts: Vec<Alert>,
    pub timestamp: DateTime<Utc>,
}

/// A pre-fused state fed straight into the analytics path, bypassing the trackers.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub state: LearningState,
    pub eye: Option<EyeMetrics>,
    /// Motor precision in [0, 1].
    pub motor_precision: f64,
    pub timestamp: DateTime<Utc>,
}

/// The signal-fusion engine for one learner session.
pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    session_start: DateTime<Utc>,
    eye: EyeTracker,
    head: HeadTracker,
    hand: HandTracker,
    fusion: StateFusion,
    screen_distances: HistoryBuffer<f64>,
    emotion_samples: HistoryBuffer<EmotionSample>,
    attention_samples: HistoryBuffer<AttentionSample>,
    series: AnalyticsSeries,
    alerts: AlertMonitor,
    frames_processed: u64,
}

impl Engine {
    /// Validates `config` and builds an engine on the system clock.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    pub fn with_defaults() -> Self {
        Self::build(EngineConfig::default(), Arc::new(SystemClock))
    }

    fn build(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let session_start = clock.now();
        info!(
            buffer_size = config.buffer_size,
            analytics_capacity = config.analytics_capacity,
            alert_retention_hours = config.alert_retention_hours,
            "engine session started"
        );
        Self {
            eye: EyeTracker::new(&config),
            head: HeadTracker::new(&config),
            hand: HandTracker::new(&config),
            fusion: StateFusion::new(&config),
            screen_distances: HistoryBuffer::new(config.screen_distance_history_size),
            emotion_samples: HistoryBuffer::new(config.buffer_size),
            attention_samples: HistoryBuffer::new(config.buffer_size),
            series: AnalyticsSeries::new(config.analytics_capacity),
            alerts: AlertMonitor::new(&config),
            frames_processed: 0,
            session_start,
            clock,
            config,
        }
    }

    /// Runs one frame through every stage and returns the complete result.
    pub fn analyze_frame(&mut self, input: &FrameInput) -> FrameResult {
        // Stage 1: Per-modality analysis
        let eye = self.eye.update(input.face.as_ref(), input.timestamp);
        let head = self.head.update(input.face.as_ref());
        let hand = self.hand.update(&input.hands);
        if let Some(distance) = input.screen_distance {
            self.screen_distances.push(distance);
        }

        // Stage 2: Fusion
        let inputs = FusionInputs {
            emotion: &input.emotion,
            eye: eye.as_ref(),
            head: head.as_ref(),
            hand: hand.as_ref(),
        };
        let mut context = AssessmentContext {
            mean_motor_precision: self.hand.mean_precision(),
            mean_screen_distance: AssessmentContext::screen_distance_from(self.screen_distances.iter()),
            fidget_count: self.hand.fidget_count_mut(),
        };
        let learning_state = self.fusion.fuse(&inputs, &mut context);

        self.emotion_samples.push(EmotionSample {
            emotion: input.emotion.label,
            confidence: input.emotion.confidence,
            timestamp: input.timestamp,
        });
        self.attention_samples.push(AttentionSample {
            score: learning_state.attention,
            timestamp: input.timestamp,
        });

        // Stages 3 and 4: Derived scores, analytics and alerts
        let (scores, new_alerts) = self.record(
            &learning_state,
            eye.as_ref(),
            motor_precision_or_full(hand.as_ref()),
            input.timestamp,
        );
        self.frames_processed += 1;

        FrameResult {
            learning_state,
            metrics: FrameMetrics { eye, head, hand },
            scores,
            new_alerts,
            timestamp: input.timestamp,
        }
    }

    /// Processes one frame and returns the fused learning state.
    pub fn process_frame(&mut self, input: &FrameInput) -> LearningState {
        self.analyze_frame(input).learning_state
    }

    /// Feeds an already fused state through the analytics and alert path.
    pub fn record_observation(&mut self, observation: &Observation) -> DerivedScores {
        let (scores, _) = self.record(
            &observation.state,
            observation.eye.as_ref(),
            observation.motor_precision,
            observation.timestamp,
        );
        scores
    }

    fn record(
        &mut self,
        state: &LearningState,
        eye: Option<&EyeMetrics>,
        motor_precision: f64,
        at: DateTime<Utc>,
    ) -> (DerivedScores, Vec<Alert>) {
        let scores = self.fusion.derive_scores(
            state,
            eye,
            self.hand.fidget_count(),
            self.head.movement_variance(),
        );

        self.series.push(AnalyticsPoint {
            timestamp: at,
            emotion: state.primary_emotion,
            stress: state.stress * 100.0,
            attention: state.attention * 100.0,
            engagement: state.engagement * 100.0,
            fatigue: state.fatigue * 100.0,
            adhd_risk: scores.adhd_risk,
            visual_strain: scores.visual_strain,
            cognitive_load: scores.cognitive_load,
            motor_precision: motor_precision * 100.0,
            accessibility_needs: state.accessibility.recommendations.len(),
        });

        let new_alerts = self.alerts.check(state, &scores, at);
        (scores, new_alerts)
    }

    /// Windowed analytics report over the last `window_hours`.
    pub fn report(&self, window_hours: f64) -> AnalyticsOutcome {
        let now = self.clock.now();
        let cutoff = window_start(now, window_hours * 3600.0);
        let window = self.series.window(cutoff);
        let visible: Vec<Alert> = self.alerts.visible(now).cloned().collect();
        build_report(&window, ReportContext::new(now, self.session_start, &visible))
    }

    /// Short-horizon attention and emotion trend over the raw sample buffers.
    pub fn trend_analysis(&self, window_minutes: f64) -> Option<TrendAnalysis> {
        let cutoff = window_start(self.clock.now(), window_minutes * 60.0);
        analyze_trend(self.emotion_samples.iter(), self.attention_samples.iter(), cutoff)
    }

    /// Drops alerts that have aged out as of the clock's current time.
    pub fn expire_alerts(&mut self) -> usize {
        let now = self.clock.now();
        self.alerts.expire(now)
    }

    pub fn session(&self) -> SessionView<'_> {
        SessionView::new(self)
    }

    pub fn current_snapshot(&self) -> SessionSnapshot {
        self.session().snapshot()
    }

    pub fn export_session(&self) -> SessionExport {
        self.session().export()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session_start(&self) -> DateTime<Utc> {
        self.session_start
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn eye_tracker(&self) -> &EyeTracker {
        &self.eye
    }

    pub fn head_tracker(&self) -> &HeadTracker {
        &self.head
    }

    pub fn hand_tracker(&self) -> &HandTracker {
        &self.hand
    }

    pub fn series(&self) -> &AnalyticsSeries {
        &self.series
    }

    pub fn alerts(&self) -> &AlertMonitor {
        &self.alerts
    }

    pub fn emotion_samples(&self) -> &HistoryBuffer<EmotionSample> {
        &self.emotion_samples
    }

    pub fn attention_samples(&self) -> &HistoryBuffer<AttentionSample> {
        &self.attention_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::landmarks::{EmotionLabel, EmotionVector, LandmarkPoint};
    use crate::core_modules::utils::clock::ManualClock;
    use crate::simulation::{FaceSpec, synthetic_face, synthetic_hand};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn engine_at(clock: &ManualClock) -> Engine {
        Engine::with_clock(EngineConfig::default(), Arc::new(clock.clone())).unwrap()
    }

    fn neutral() -> EmotionReading {
        EmotionReading::from_scores(EmotionVector::from_pairs(&[(EmotionLabel::Neutral, 100.0)]))
    }

    #[test]
    fn zero_capacity_config_is_rejected() {
        let config = EngineConfig {
            analytics_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(config),
            Err(ConfigError::ZeroCapacity { field: "analytics_capacity" })
        ));
    }

    #[test]
    fn hands_without_face_still_fuse() {
        let clock = ManualClock::new(t0());
        let mut engine = engine_at(&clock);
        let input = FrameInput::new(neutral(), t0())
            .with_hands(vec![synthetic_hand(LandmarkPoint::new(0.5, 0.6), 0.05)]);

        let result = engine.analyze_frame(&input);
        assert!(result.metrics.eye.is_none());
        assert!(result.metrics.head.is_none());
        assert_eq!(result.metrics.hand.map(|h| h.hands_detected), Some(1));
        // Only the hand factor is available.
        assert!((result.learning_state.attention - 0.8).abs() < 1e-12);
        assert_eq!(engine.series().len(), 1);
        assert_eq!(engine.attention_samples().len(), 1);
    }

    #[test]
    fn analytics_points_are_percentages() {
        let clock = ManualClock::new(t0());
        let mut engine = engine_at(&clock);
        let input = FrameInput::new(neutral(), t0()).with_face(synthetic_face(&FaceSpec::default()));
        engine.process_frame(&input);

        let point = engine.series().latest().copied().unwrap();
        assert_eq!(point.emotion, EmotionLabel::Neutral);
        assert_eq!(point.motor_precision, 100.0);
        assert!(point.attention >= 0.0 && point.attention <= 100.0);
        assert_eq!(engine.frames_processed(), 1);
    }

    #[test]
    fn report_windows_by_clock() {
        let clock = ManualClock::new(t0());
        let mut engine = engine_at(&clock);
        engine.process_frame(&FrameInput::new(neutral(), t0()));

        clock.advance(Duration::minutes(30));
        assert!(!engine.report(1.0).is_no_data());

        clock.advance(Duration::hours(1));
        assert!(engine.report(1.0).is_no_data());
        assert!(!engine.report(24.0).is_no_data());
    }

    #[test]
    fn unbounded_windows_include_everything() {
        let clock = ManualClock::new(t0());
        let mut engine = engine_at(&clock);
        engine.process_frame(&FrameInput::new(neutral(), t0()));
        clock.advance(Duration::days(400));

        for hours in [1e10, f64::MAX, f64::INFINITY] {
            let outcome = engine.report(hours);
            assert_eq!(outcome.report().map(|r| r.data_points), Some(1));
        }
        assert!(engine.report(f64::NEG_INFINITY).is_no_data());
        assert!(engine.trend_analysis(f64::MAX).is_some());
        assert!(engine.trend_analysis(f64::INFINITY).is_some());
    }

    #[test]
    fn trend_analysis_needs_recent_samples() {
        let clock = ManualClock::new(t0());
        let mut engine = engine_at(&clock);
        assert!(engine.trend_analysis(DEFAULT_TREND_WINDOW_MINUTES).is_none());

        for i in 0..3 {
            engine.process_frame(&FrameInput::new(neutral(), t0() + Duration::seconds(i)));
        }
        let trend = engine.trend_analysis(DEFAULT_TREND_WINDOW_MINUTES).unwrap();
        assert_eq!(trend.dominant_emotions, vec![EmotionLabel::Neutral; 3]);
        assert!((trend.avg_attention - 0.5).abs() < 1e-12);

        clock.advance(Duration::minutes(10));
        assert!(engine.trend_analysis(DEFAULT_TREND_WINDOW_MINUTES).is_none());
    }

    #[test]
    fn observations_share_the_analytics_path() {
        let clock = ManualClock::new(t0());
        let mut engine = engine_at(&clock);
        let observation = Observation {
            state: LearningState {
                stress: 0.9,
                attention: 0.2,
                ..Default::default()
            },
            eye: None,
            motor_precision: 0.8,
            timestamp: t0(),
        };
        let scores = engine.record_observation(&observation);
        assert_eq!(scores.cognitive_load, 66.0);
        assert_eq!(engine.alerts().len(), 1);
        assert_eq!(engine.series().latest().map(|p| p.motor_precision), Some(80.0));
        // Observations do not touch the raw sample buffers.
        assert!(engine.attention_samples().is_empty());
    }

    #[test]
    fn expire_alerts_uses_clock() {
        let clock = ManualClock::new(t0());
        let mut engine = engine_at(&clock);
        let angry = EmotionReading::from_scores(EmotionVector::from_pairs(&[(EmotionLabel::Angry, 95.0)]));
        engine.process_frame(&FrameInput::new(angry, t0()));
        assert!(!engine.alerts().is_empty());

        clock.advance(Duration::hours(25));
        assert!(engine.expire_alerts() > 0);
        assert!(engine.alerts().is_empty());
    }
}
