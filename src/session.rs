// THEORY:
// The session facade is the read side of the engine. A `SessionView` borrows an
// `Engine` immutably and assembles the bundles an outer layer (a dashboard, an
// HTTP handler, a file exporter) wants: the current snapshot, the
// accessibility recommendation bundle and the full session export.
//
// Nothing here mutates the engine. Every bundle is built from the latest
// analytics point, the raw sample buffers and the visible alerts, with "now"
// taken from the engine's clock.

use crate::core_modules::alerts::Alert;
use crate::core_modules::analytics::{AnalyticsOutcome, AnalyticsPoint, AttentionSample, EmotionSample, Recommendation};
use crate::core_modules::head_tracker::HeadPosition;
use crate::core_modules::landmarks::{EmotionLabel, LandmarkPoint};
use crate::core_modules::utils::clock::seconds_between;
use crate::core_modules::utils::stats::stats;
use crate::pipeline::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Window of the report embedded in a snapshot.
const SNAPSHOT_REPORT_HOURS: f64 = 1.0;
/// Window of the report embedded in an export.
const EXPORT_REPORT_HOURS: f64 = 24.0;
pub const EXPORT_VERSION: &str = "1.0";
/// Performance metrics below this trigger a suggestion.
const PERFORMANCE_SUGGESTION_THRESHOLD: f64 = 50.0;
const CONTINUE_RECOMMENDATION: &str = "Continue with current approach";

/// The latest metrics, 0-100, with neutral defaults before the first frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentState {
    pub emotion: EmotionLabel,
    pub stress_level: f64,
    pub adhd_risk: f64,
    pub attention_score: f64,
    pub engagement_level: f64,
    pub visual_strain: f64,
    pub cognitive_load: f64,
}

impl Default for CurrentState {
    fn default() -> Self {
        Self {
            emotion: EmotionLabel::Neutral,
            stress_level: 0.0,
            adhd_risk: 0.0,
            attention_score: 70.0,
            engagement_level: 50.0,
            visual_strain: 0.0,
            cognitive_load: 0.0,
        }
    }
}

impl From<&AnalyticsPoint> for CurrentState {
    fn from(point: &AnalyticsPoint) -> Self {
        Self {
            emotion: point.emotion,
            stress_level: point.stress,
            adhd_risk: point.adhd_risk,
            attention_score: point.attention,
            engagement_level: point.engagement,
            visual_strain: point.visual_strain,
            cognitive_load: point.cognitive_load,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub duration_secs: f64,
    pub data_points: usize,
    pub frames_processed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub current_state: CurrentState,
    pub analytics: AnalyticsOutcome,
    pub recommendations: Vec<String>,
    /// Visible alerts raised within the last hour.
    pub critical_alerts: Vec<Alert>,
    pub session_info: SessionInfo,
    pub status: SessionStatus,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilityRecommendations {
    pub immediate: Vec<String>,
    pub detailed: Vec<Recommendation>,
    pub critical_alerts: Vec<Alert>,
    pub performance_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_emotions: usize,
    pub total_attention_points: usize,
    /// Mean buffered attention in [0, 1].
    pub avg_attention: f64,
    pub fidget_episodes: u32,
    pub session_duration_minutes: f64,
    pub critical_alerts_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawBuffers {
    pub emotions: Vec<EmotionSample>,
    pub attention: Vec<AttentionSample>,
    pub movements: Vec<LandmarkPoint>,
    pub head_poses: Vec<HeadPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionExport {
    pub session_summary: SessionSummary,
    pub analytics_data: Vec<AnalyticsPoint>,
    pub raw_buffers: RawBuffers,
    pub critical_alerts: Vec<Alert>,
    pub full_report: AnalyticsOutcome,
    pub exported_at: DateTime<Utc>,
    pub export_version: String,
}

/// Read-only view over an engine's session state.
#[derive(Clone, Copy)]
pub struct SessionView<'a> {
    engine: &'a Engine,
}

impl<'a> SessionView<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    pub fn current_state(&self) -> CurrentState {
        self.engine.series().latest().map(CurrentState::from).unwrap_or_default()
    }

    /// Immediate suggestions from the latest analytics point.
    pub fn current_recommendations(&self) -> Vec<String> {
        let Some(latest) = self.engine.series().latest() else {
            return vec![CONTINUE_RECOMMENDATION.to_string()];
        };

        let rules = [
            (latest.stress > 60.0, "Take a 5-minute breathing break"),
            (latest.adhd_risk > 50.0, "Switch to structured task format"),
            (latest.attention < 50.0, "Consider a short break to refocus"),
            (latest.visual_strain > 60.0, "Adjust screen brightness and take eye break"),
        ];
        let recommendations: Vec<String> = rules
            .iter()
            .filter(|(fired, _)| *fired)
            .map(|(_, text)| text.to_string())
            .collect();

        if recommendations.is_empty() {
            vec![CONTINUE_RECOMMENDATION.to_string()]
        } else {
            recommendations
        }
    }

    pub fn session_info(&self) -> SessionInfo {
        SessionInfo {
            duration_secs: seconds_between(self.engine.session_start(), self.engine.now()),
            data_points: self.engine.series().len(),
            frames_processed: self.engine.frames_processed(),
        }
    }

    /// Visible alerts raised within the last hour.
    fn last_hour_alerts(&self, now: DateTime<Utc>) -> Vec<Alert> {
        self.engine.alerts().since(now - Duration::hours(1), now)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.engine.now();
        SessionSnapshot {
            current_state: self.current_state(),
            analytics: self.engine.report(SNAPSHOT_REPORT_HOURS),
            recommendations: self.current_recommendations(),
            critical_alerts: self.last_hour_alerts(now),
            session_info: self.session_info(),
            status: SessionStatus::Active,
            last_updated: now,
        }
    }

    pub fn accessibility_recommendations(&self) -> AccessibilityRecommendations {
        let snapshot = self.snapshot();
        let mut bundle = AccessibilityRecommendations {
            immediate: snapshot.recommendations,
            detailed: Vec::new(),
            critical_alerts: snapshot.critical_alerts,
            performance_suggestions: Vec::new(),
        };

        if let Some(report) = snapshot.analytics.report() {
            bundle.detailed = report.recommendations.clone();

            let metrics = &report.performance_metrics;
            let checks = [
                (metrics.attention_efficiency, "Consider shorter learning sessions"),
                (metrics.stress_management, "Implement regular stress breaks"),
                (metrics.visual_comfort, "Adjust display settings for comfort"),
            ];
            for (value, suggestion) in checks {
                if value < PERFORMANCE_SUGGESTION_THRESHOLD {
                    bundle.performance_suggestions.push(suggestion.to_string());
                }
            }
        }
        bundle
    }

    pub fn summary(&self) -> SessionSummary {
        let attention = self.engine.attention_samples();
        let now = self.engine.now();
        let session_duration_minutes = attention
            .oldest()
            .map(|first| seconds_between(first.timestamp, now) / 60.0)
            .unwrap_or(0.0);

        SessionSummary {
            total_emotions: self.engine.emotion_samples().len(),
            total_attention_points: attention.len(),
            avg_attention: stats::mean(attention.iter().map(|s| s.score)),
            fidget_episodes: self.engine.hand_tracker().fidget_count(),
            session_duration_minutes,
            critical_alerts_count: self.engine.alerts().visible(now).count(),
        }
    }

    pub fn raw_buffers(&self) -> RawBuffers {
        RawBuffers {
            emotions: self.engine.emotion_samples().to_vec(),
            attention: self.engine.attention_samples().to_vec(),
            movements: self.engine.hand_tracker().centroid_history().to_vec(),
            head_poses: self.engine.head_tracker().pose_history().to_vec(),
        }
    }

    pub fn export(&self) -> SessionExport {
        let now = self.engine.now();
        SessionExport {
            session_summary: self.summary(),
            analytics_data: self.engine.series().to_vec(),
            raw_buffers: self.raw_buffers(),
            critical_alerts: self.engine.alerts().visible(now).cloned().collect(),
            full_report: self.engine.report(EXPORT_REPORT_HOURS),
            exported_at: now,
            export_version: EXPORT_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::core_modules::landmarks::{EmotionLabel, EmotionReading, EmotionVector, LandmarkPoint};
    use crate::core_modules::utils::clock::ManualClock;
    use crate::pipeline::{Engine, FrameInput};
    use crate::simulation::{FaceSpec, synthetic_face, synthetic_hand};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn engine(clock: &ManualClock) -> Engine {
        Engine::with_clock(EngineConfig::default(), Arc::new(clock.clone())).unwrap()
    }

    fn reading(pairs: &[(EmotionLabel, f64)]) -> EmotionReading {
        EmotionReading::from_scores(EmotionVector::from_pairs(pairs))
    }

    #[test]
    fn fresh_session_uses_defaults() {
        let clock = ManualClock::new(t0());
        let engine = engine(&clock);
        let snapshot = engine.current_snapshot();
        assert_eq!(snapshot.current_state.attention_score, 70.0);
        assert_eq!(snapshot.current_state.engagement_level, 50.0);
        assert!(snapshot.analytics.is_no_data());
        assert_eq!(snapshot.recommendations, vec!["Continue with current approach".to_string()]);
        assert_eq!(snapshot.session_info.data_points, 0);

        let bundle = engine.session().accessibility_recommendations();
        assert!(bundle.detailed.is_empty());
        assert!(bundle.performance_suggestions.is_empty());
    }

    #[test]
    fn stressed_frame_drives_immediate_recommendations() {
        let clock = ManualClock::new(t0());
        let mut engine = engine(&clock);
        let angry = reading(&[(EmotionLabel::Angry, 90.0), (EmotionLabel::Neutral, 10.0)]);
        engine.process_frame(&FrameInput::new(angry, t0()));

        let view = engine.session();
        let recommendations = view.current_recommendations();
        assert_eq!(recommendations[0], "Take a 5-minute breathing break");
        // Attention defaults to 0.5 without trackers, which is not below 50%.
        assert!(!recommendations.contains(&"Consider a short break to refocus".to_string()));

        let bundle = view.accessibility_recommendations();
        assert_eq!(bundle.critical_alerts.len(), 1);
        assert_eq!(bundle.performance_suggestions, vec!["Implement regular stress breaks".to_string()]);
        assert!(!bundle.detailed.is_empty());
    }

    #[test]
    fn snapshot_alerts_cover_the_last_hour() {
        let clock = ManualClock::new(t0());
        let mut engine = engine(&clock);
        let angry = reading(&[(EmotionLabel::Angry, 95.0)]);
        engine.process_frame(&FrameInput::new(angry, t0()));

        clock.advance(Duration::minutes(90));
        let snapshot = engine.current_snapshot();
        assert!(snapshot.critical_alerts.is_empty());
        assert_eq!(engine.export_session().critical_alerts.len(), 1);
        assert_eq!(snapshot.session_info.duration_secs, 5400.0);
    }

    #[test]
    fn export_contains_raw_buffers_and_summary() {
        let clock = ManualClock::new(t0());
        let mut engine = engine(&clock);
        for i in 0..4 {
            let at = t0() + Duration::seconds(i * 15);
            let input = FrameInput::new(reading(&[(EmotionLabel::Happy, 80.0)]), at)
                .with_face(synthetic_face(&FaceSpec::default()))
                .with_hands(vec![synthetic_hand(LandmarkPoint::new(0.4, 0.6), 0.05)]);
            engine.process_frame(&input);
        }
        clock.set(t0() + Duration::minutes(2));

        let export = engine.export_session();
        assert_eq!(export.export_version, "1.0");
        assert_eq!(export.analytics_data.len(), 4);
        assert_eq!(export.raw_buffers.emotions.len(), 4);
        assert_eq!(export.raw_buffers.movements.len(), 4);
        assert_eq!(export.raw_buffers.head_poses.len(), 4);
        assert_eq!(export.session_summary.total_attention_points, 4);
        assert_eq!(export.session_summary.session_duration_minutes, 2.0);
        assert_eq!(export.session_summary.fidget_episodes, 0);
        assert!(!export.full_report.is_no_data());

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["raw_buffers"]["emotions"][0]["emotion"], "happy");
    }
}
