// THEORY:
// The alert monitor is a tiny state machine with a single state: monitoring.
// Each fused frame is checked against four fixed thresholds and every crossing
// appends a new `Alert`. There is deliberately no deduplication: a learner who
// stays stressed for a minute produces a stream of `high_stress` alerts, and
// that frequency is what the reports count.
//
// The only lifecycle rule is retention. After every emission pass, alerts whose
// age has reached the retention horizon are dropped, so the list is bounded by
// time rather than by count.

use crate::config::EngineConfig;
use crate::core_modules::fusion::{DerivedScores, LearningState};
use crate::core_modules::utils::clock::duration_from_secs;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighStress,
    VisualStrain,
    AdhdSupport,
    CognitiveOverload,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::HighStress => "high_stress",
            AlertKind::VisualStrain => "visual_strain",
            AlertKind::AdhdSupport => "adhd_support",
            AlertKind::CognitiveOverload => "cognitive_overload",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AlertKind::HighStress => "High stress level detected - consider immediate break",
            AlertKind::VisualStrain => "Severe visual strain detected - adjust display settings",
            AlertKind::AdhdSupport => "ADHD patterns detected - enable structured support",
            AlertKind::CognitiveOverload => "Cognitive overload detected - simplify content",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AlertKind::AdhdSupport => Severity::Medium,
            _ => Severity::High,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
}

impl Alert {
    pub fn new(kind: AlertKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
            timestamp,
            severity: kind.severity(),
        }
    }

    fn is_live_at(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        now - self.timestamp < retention
    }
}

#[derive(Debug, Clone)]
pub struct AlertMonitor {
    /// Retained alerts, oldest first.
    alerts: Vec<Alert>,
    retention: Duration,
    stress_threshold: f64,
    visual_strain_threshold: f64,
    adhd_threshold: f64,
    cognitive_overload_threshold: f64,
}

impl AlertMonitor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            alerts: Vec::new(),
            retention: duration_from_secs(config.alert_retention_hours * 3600.0),
            stress_threshold: config.stress_alert_threshold,
            visual_strain_threshold: config.visual_strain_alert_threshold,
            adhd_threshold: config.adhd_alert_threshold,
            cognitive_overload_threshold: config.cognitive_overload_alert_threshold,
        }
    }

    /// Runs one emission pass for a fused frame, then applies retention.
    /// Returns the alerts emitted by this pass.
    pub fn check(&mut self, state: &LearningState, scores: &DerivedScores, at: DateTime<Utc>) -> Vec<Alert> {
        let crossings = [
            (AlertKind::HighStress, state.stress > self.stress_threshold),
            (AlertKind::VisualStrain, scores.visual_strain > self.visual_strain_threshold),
            (AlertKind::AdhdSupport, scores.adhd_risk > self.adhd_threshold),
            (AlertKind::CognitiveOverload, scores.cognitive_load > self.cognitive_overload_threshold),
        ];

        let emitted: Vec<Alert> = crossings
            .into_iter()
            .filter(|(_, crossed)| *crossed)
            .map(|(kind, _)| Alert::new(kind, at))
            .collect();

        for alert in &emitted {
            info!(kind = %alert.kind, severity = ?alert.severity, "critical alert raised");
        }
        self.alerts.extend(emitted.iter().cloned());
        self.expire(at);
        emitted
    }

    /// Drops every alert whose age at `now` has reached the retention horizon.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.alerts.len();
        let retention = self.retention;
        self.alerts.retain(|alert| alert.is_live_at(now, retention));
        before - self.alerts.len()
    }

    /// Alerts still inside the retention horizon at `now`, without mutating the list.
    pub fn visible(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Alert> {
        let retention = self.retention;
        self.alerts.iter().filter(move |alert| alert.is_live_at(now, retention))
    }

    /// Visible alerts raised after `since`.
    pub fn since(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> Vec<Alert> {
        self.visible(now).filter(|alert| alert.timestamp > since).cloned().collect()
    }

    /// The last `n` visible alerts, oldest first.
    pub fn recent(&self, n: usize, now: DateTime<Utc>) -> Vec<Alert> {
        let visible: Vec<&Alert> = self.visible(now).collect();
        let skip = visible.len().saturating_sub(n);
        visible.into_iter().skip(skip).cloned().collect()
    }

    pub fn high_severity_count(&self, now: DateTime<Utc>) -> usize {
        self.visible(now).filter(|alert| alert.severity == Severity::High).count()
    }

    /// The raw retained list, pruned only by `check` and `expire`. Between those
    /// calls it can still hold alerts past the retention horizon; use `visible`
    /// for anything shown to a caller.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Length of the raw retained list. See `alerts`.
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Whether the raw retained list is empty. See `alerts`.
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
