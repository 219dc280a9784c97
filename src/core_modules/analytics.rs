// THEORY:
// The analytics aggregator turns the per-frame stream into something a
// dashboard can read. Every fused frame contributes one `AnalyticsPoint`, a flat
// record of all derived metrics on a 0-100 scale. Points live in a bounded
// series, so the oldest are evicted once capacity is reached and all fields
// stay aligned because they travel together in one struct.
//
// Key architectural principles:
// 1.  **Reports Are Pure**: `build_report` reads a window of points plus a
//     context (now, session start, recent alerts) and returns a value. Nothing
//     in the series changes, so asking twice gives the same answer.
// 2.  **Independent Rules**: Insights and recommendations are produced by
//     separate threshold rules. Each rule looks only at the summary statistics,
//     so several can fire together and their order is fixed by the rule list.
// 3.  **No Data Is A Value**: An empty window yields `AnalyticsOutcome::NoData`,
//     a structured notice the caller can serialize, never an error.

use crate::core_modules::alerts::{Alert, Severity};
use crate::core_modules::history::HistoryBuffer;
use crate::core_modules::landmarks::EmotionLabel;
use crate::core_modules::utils::clock::seconds_between;
use crate::core_modules::utils::stats::stats::{max, mean, std_dev};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NO_DATA_MESSAGE: &str = "No data available for the specified time window";
/// Number of alerts attached to a report.
pub const REPORT_ALERT_LIMIT: usize = 10;
/// Relative band inside which the second half of a window counts as unchanged.
const TREND_BAND: f64 = 0.1;

/// One frame's derived metrics, each on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsPoint {
    pub timestamp: DateTime<Utc>,
    pub emotion: EmotionLabel,
    pub stress: f64,
    pub attention: f64,
    pub engagement: f64,
    pub fatigue: f64,
    pub adhd_risk: f64,
    pub visual_strain: f64,
    pub cognitive_load: f64,
    pub motor_precision: f64,
    /// Number of accessibility recommendations active on this frame.
    pub accessibility_needs: usize,
}

/// Capacity-bounded, timestamp-ordered series of analytics points.
#[derive(Debug, Clone)]
pub struct AnalyticsSeries {
    points: HistoryBuffer<AnalyticsPoint>,
}

impl AnalyticsSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: HistoryBuffer::new(capacity),
        }
    }

    pub fn push(&mut self, point: AnalyticsPoint) {
        self.points.push(point);
    }

    /// Points with `timestamp >= cutoff`, oldest first.
    pub fn window(&self, cutoff: DateTime<Utc>) -> Vec<&AnalyticsPoint> {
        self.points.iter().filter(|p| p.timestamp >= cutoff).collect()
    }

    pub fn latest(&self) -> Option<&AnalyticsPoint> {
        self.points.latest()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AnalyticsPoint> + ExactSizeIterator {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.points.capacity()
    }

    pub fn to_vec(&self) -> Vec<AnalyticsPoint> {
        self.points.to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// Compares the mean of the second half of `values` against the first half.
pub fn trend(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend::Stable;
    }
    let (first, second) = values.split_at(values.len() / 2);
    let first = mean(first.iter().copied());
    let second = mean(second.iter().copied());

    if second > first * (1.0 + TREND_BAND) {
        Trend::Increasing
    } else if second < first * (1.0 - TREND_BAND) {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdhdRiskCategory {
    Low,
    Moderate,
    High,
}

impl AdhdRiskCategory {
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            AdhdRiskCategory::Low
        } else if score < 60.0 {
            AdhdRiskCategory::Moderate
        } else {
            AdhdRiskCategory::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdhdRiskCategory::Low => "Low Risk",
            AdhdRiskCategory::Moderate => "Moderate Risk",
            AdhdRiskCategory::High => "High Risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub avg_stress: f64,
    pub max_stress: f64,
    pub stress_trend: Trend,
    pub dominant_emotion: EmotionLabel,
    /// Number of distinct emotion labels observed in the window.
    pub emotion_diversity: usize,
    pub avg_adhd_risk: f64,
    pub adhd_category: AdhdRiskCategory,
    pub avg_attention: f64,
    /// 100 minus the population std of attention.
    pub attention_stability: f64,
    pub avg_visual_strain: f64,
    pub max_visual_strain: f64,
    pub avg_cognitive_load: f64,
    pub peak_cognitive_load: f64,
    pub avg_engagement: f64,
    pub engagement_trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Stress,
    Attention,
    Adhd,
    Visual,
    Engagement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightAction {
    Immediate,
    Monitor,
    Adapt,
    Structure,
    Support,
    Environment,
    Content,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub message: String,
    pub priority: Priority,
    pub action: InsightAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    StressManagement,
    AdhdSupport,
    AttentionImprovement,
    VisualComfort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub action: String,
    pub details: Vec<String>,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub attention_efficiency: f64,
    pub attention_consistency: f64,
    pub engagement_rate: f64,
    pub peak_engagement: f64,
    /// 100 minus the percentage of points with stress above 70.
    pub stress_management: f64,
    pub visual_comfort: f64,
    /// Retained alerts with high severity.
    pub critical_events: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub summary: SummaryStatistics,
    pub insights: Vec<Insight>,
    pub performance_metrics: PerformanceMetrics,
    pub critical_alerts: Vec<Alert>,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
    pub data_points: usize,
    pub session_duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoDataNotice {
    pub error: String,
}

impl Default for NoDataNotice {
    fn default() -> Self {
        Self {
            error: NO_DATA_MESSAGE.to_string(),
        }
    }
}

/// Result of a windowed report request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyticsOutcome {
    NoData(NoDataNotice),
    Report(Box<AnalyticsReport>),
}

impl AnalyticsOutcome {
    pub fn is_no_data(&self) -> bool {
        matches!(self, AnalyticsOutcome::NoData(_))
    }

    pub fn report(&self) -> Option<&AnalyticsReport> {
        match self {
            AnalyticsOutcome::Report(report) => Some(report.as_ref()),
            AnalyticsOutcome::NoData(_) => None,
        }
    }
}

/// Engine state a report needs beside the point window.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub now: DateTime<Utc>,
    pub session_start: DateTime<Utc>,
    /// The most recent visible alerts, oldest first.
    pub recent_alerts: Vec<Alert>,
    /// All visible alerts with high severity.
    pub critical_events: usize,
}

impl ReportContext {
    pub fn new(now: DateTime<Utc>, session_start: DateTime<Utc>, visible_alerts: &[Alert]) -> Self {
        let skip = visible_alerts.len().saturating_sub(REPORT_ALERT_LIMIT);
        Self {
            now,
            session_start,
            recent_alerts: visible_alerts[skip..].to_vec(),
            critical_events: visible_alerts.iter().filter(|a| a.severity == Severity::High).count(),
        }
    }
}

/// Builds the report for an already filtered window.
pub fn build_report(window: &[&AnalyticsPoint], context: ReportContext) -> AnalyticsOutcome {
    if window.is_empty() {
        return AnalyticsOutcome::NoData(NoDataNotice::default());
    }

    let summary = summarize(window);
    let insights = insights(&summary);
    let recommendations = recommendations(&summary);
    let performance_metrics = performance_metrics(window, context.critical_events);

    AnalyticsOutcome::Report(Box::new(AnalyticsReport {
        summary,
        insights,
        performance_metrics,
        critical_alerts: context.recent_alerts,
        recommendations,
        generated_at: context.now,
        data_points: window.len(),
        session_duration_secs: seconds_between(context.session_start, context.now),
    }))
}

fn column(window: &[&AnalyticsPoint], field: impl Fn(&AnalyticsPoint) -> f64) -> Vec<f64> {
    window.iter().map(|&p| field(p)).collect()
}

/// Most frequent label; ties go to the label seen first. Also returns the number of distinct labels.
fn emotion_counts(window: &[&AnalyticsPoint]) -> (EmotionLabel, usize) {
    let mut counts: Vec<(EmotionLabel, usize)> = Vec::new();
    for point in window {
        match counts.iter_mut().find(|(label, _)| *label == point.emotion) {
            Some((_, count)) => *count += 1,
            None => counts.push((point.emotion, 1)),
        }
    }

    let mut dominant = (EmotionLabel::Neutral, 0);
    for &(label, count) in &counts {
        if count > dominant.1 {
            dominant = (label, count);
        }
    }
    (dominant.0, counts.len())
}

pub fn summarize(window: &[&AnalyticsPoint]) -> SummaryStatistics {
    let stress = column(window, |p| p.stress);
    let attention = column(window, |p| p.attention);
    let engagement = column(window, |p| p.engagement);
    let adhd = column(window, |p| p.adhd_risk);
    let visual = column(window, |p| p.visual_strain);
    let cognitive = column(window, |p| p.cognitive_load);
    let (dominant_emotion, emotion_diversity) = emotion_counts(window);
    let avg_adhd_risk = mean(adhd.iter().copied());

    SummaryStatistics {
        avg_stress: mean(stress.iter().copied()),
        max_stress: max(&stress),
        stress_trend: trend(&stress),
        dominant_emotion,
        emotion_diversity,
        avg_adhd_risk,
        adhd_category: AdhdRiskCategory::from_score(avg_adhd_risk),
        avg_attention: mean(attention.iter().copied()),
        attention_stability: 100.0 - std_dev(&attention),
        avg_visual_strain: mean(visual.iter().copied()),
        max_visual_strain: max(&visual),
        avg_cognitive_load: mean(cognitive.iter().copied()),
        peak_cognitive_load: max(&cognitive),
        avg_engagement: mean(engagement.iter().copied()),
        engagement_trend: trend(&engagement),
    }
}

pub fn insights(summary: &SummaryStatistics) -> Vec<Insight> {
    let mut insights = Vec::new();
    let mut add = |kind, message: String, priority, action| {
        insights.push(Insight {
            kind,
            message,
            priority,
            action,
        })
    };

    if summary.avg_stress > 60.0 {
        add(
            InsightKind::Stress,
            format!(
                "High average stress level ({:.1}%). Consider implementing stress reduction techniques.",
                summary.avg_stress
            ),
            Priority::High,
            InsightAction::Immediate,
        );
    } else if summary.stress_trend == Trend::Increasing {
        add(
            InsightKind::Stress,
            "Stress levels are trending upward. Monitor closely and consider preventive measures.".to_string(),
            Priority::Medium,
            InsightAction::Monitor,
        );
    }

    if summary.avg_attention < 50.0 {
        add(
            InsightKind::Attention,
            format!(
                "Low attention scores ({:.1}%). Recommend shorter learning sessions and breaks.",
                summary.avg_attention
            ),
            Priority::High,
            InsightAction::Adapt,
        );
    } else if summary.attention_stability < 70.0 {
        add(
            InsightKind::Attention,
            "Attention levels are unstable. Consider structured learning approaches.".to_string(),
            Priority::Medium,
            InsightAction::Structure,
        );
    }

    if summary.avg_adhd_risk > 60.0 {
        add(
            InsightKind::Adhd,
            format!(
                "ADHD patterns detected ({}). Enable structured support features.",
                summary.adhd_category.label()
            ),
            Priority::High,
            InsightAction::Support,
        );
    }

    if summary.avg_visual_strain > 50.0 {
        add(
            InsightKind::Visual,
            format!(
                "Visual strain detected ({:.1}%). Adjust display settings and lighting.",
                summary.avg_visual_strain
            ),
            Priority::Medium,
            InsightAction::Environment,
        );
    }

    if summary.avg_engagement < 40.0 {
        add(
            InsightKind::Engagement,
            "Low engagement levels. Consider more interactive content and gamification.".to_string(),
            Priority::Medium,
            InsightAction::Content,
        );
    }

    insights
}

fn details(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn recommendations(summary: &SummaryStatistics) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if summary.avg_stress > 50.0 {
        recommendations.push(Recommendation {
            category: RecommendationCategory::StressManagement,
            action: "Implement stress reduction techniques".to_string(),
            details: details(&[
                "Deep breathing exercises",
                "Progressive muscle relaxation",
                "5-minute mindfulness breaks",
            ]),
            priority: if summary.avg_stress > 70.0 { Priority::High } else { Priority::Medium },
        });
    }

    if summary.avg_adhd_risk > 40.0 {
        recommendations.push(Recommendation {
            category: RecommendationCategory::AdhdSupport,
            action: "Enable ADHD-friendly features".to_string(),
            details: details(&[
                "Structured task breakdown",
                "Frequent breaks",
                "Clear progress indicators",
                "Reduced distractions",
            ]),
            priority: if summary.avg_adhd_risk > 60.0 { Priority::High } else { Priority::Medium },
        });
    }

    if summary.avg_attention < 60.0 {
        recommendations.push(Recommendation {
            category: RecommendationCategory::AttentionImprovement,
            action: "Optimize attention and focus".to_string(),
            details: details(&["Shorter learning sessions", "Interactive content", "Gamification elements"]),
            priority: Priority::High,
        });
    }

    if summary.avg_visual_strain > 40.0 {
        recommendations.push(Recommendation {
            category: RecommendationCategory::VisualComfort,
            action: "Reduce visual strain".to_string(),
            details: details(&[
                "Adjust screen brightness",
                "Increase font size",
                "Use high contrast mode",
                "Take regular eye breaks",
            ]),
            priority: Priority::Medium,
        });
    }

    recommendations
}

pub fn performance_metrics(window: &[&AnalyticsPoint], critical_events: usize) -> PerformanceMetrics {
    let attention = column(window, |p| p.attention);
    let engagement = column(window, |p| p.engagement);
    let visual = column(window, |p| p.visual_strain);

    let spikes = window.iter().filter(|p| p.stress > 70.0).count();
    let spike_share = if window.is_empty() {
        0.0
    } else {
        spikes as f64 / window.len() as f64 * 100.0
    };

    PerformanceMetrics {
        attention_efficiency: mean(attention.iter().copied()),
        attention_consistency: 100.0 - std_dev(&attention),
        engagement_rate: mean(engagement.iter().copied()),
        peak_engagement: max(&engagement),
        stress_management: (100.0 - spike_share).max(0.0),
        visual_comfort: (100.0 - mean(visual.iter().copied())).max(0.0),
        critical_events,
    }
}

// --- Short-horizon trend analysis over the raw sample buffers ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionSample {
    pub emotion: EmotionLabel,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttentionSample {
    /// Attention in [0, 1].
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementTrend {
    Improving,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub avg_attention: f64,
    /// 1 minus the population std of attention.
    pub attention_stability: f64,
    /// Labels of the last five emotion samples in the window.
    pub dominant_emotions: Vec<EmotionLabel>,
    pub engagement_trend: EngagementTrend,
    pub recommendations_needed: bool,
}

const TREND_EMOTION_COUNT: usize = 5;

/// Analyzes samples newer than `cutoff`. `None` when either buffer has nothing in the window.
pub fn analyze_trend<'a>(
    emotions: impl Iterator<Item = &'a EmotionSample>,
    attention: impl Iterator<Item = &'a AttentionSample>,
    cutoff: DateTime<Utc>,
) -> Option<TrendAnalysis> {
    let emotions: Vec<EmotionLabel> = emotions
        .filter(|s| s.timestamp > cutoff)
        .map(|s| s.emotion)
        .collect();
    let scores: Vec<f64> = attention
        .filter(|s| s.timestamp > cutoff)
        .map(|s| s.score)
        .collect();

    if emotions.is_empty() || scores.is_empty() {
        return None;
    }

    let avg_attention = mean(scores.iter().copied());
    let spread = std_dev(&scores);
    let improving = scores.len() > 1 && scores[scores.len() - 1] > scores[0];
    let skip = emotions.len().saturating_sub(TREND_EMOTION_COUNT);

    Some(TrendAnalysis {
        avg_attention,
        attention_stability: 1.0 - spread,
        dominant_emotions: emotions[skip..].to_vec(),
        engagement_trend: if improving {
            EngagementTrend::Improving
        } else {
            EngagementTrend::Declining
        },
        recommendations_needed: avg_attention < 0.5 || spread > 0.3,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::alerts::AlertKind;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn point(offset_secs: i64, emotion: EmotionLabel, stress: f64, attention: f64) -> AnalyticsPoint {
        AnalyticsPoint {
            timestamp: t0() + Duration::seconds(offset_secs),
            emotion,
            stress,
            attention,
            engagement: 50.0,
            fatigue: 0.0,
            adhd_risk: 20.0,
            visual_strain: 10.0,
            cognitive_load: 30.0,
            motor_precision: 100.0,
            accessibility_needs: 0,
        }
    }

    fn context(now: DateTime<Utc>) -> ReportContext {
        ReportContext::new(now, t0(), &[])
    }

    #[test]
    fn trend_uses_halves_with_band() {
        assert_eq!(trend(&[]), Trend::Stable);
        assert_eq!(trend(&[10.0]), Trend::Stable);
        assert_eq!(trend(&[10.0, 10.0, 20.0, 20.0]), Trend::Increasing);
        assert_eq!(trend(&[20.0, 20.0, 10.0, 10.0]), Trend::Decreasing);
        assert_eq!(trend(&[10.0, 10.5]), Trend::Stable);
        // Odd lengths put the middle element in the second half.
        assert_eq!(trend(&[10.0, 30.0, 30.0]), Trend::Increasing);
    }

    #[test]
    fn adhd_categories_have_fixed_breakpoints() {
        assert_eq!(AdhdRiskCategory::from_score(29.9), AdhdRiskCategory::Low);
        assert_eq!(AdhdRiskCategory::from_score(30.0), AdhdRiskCategory::Moderate);
        assert_eq!(AdhdRiskCategory::from_score(60.0), AdhdRiskCategory::High);
    }

    #[test]
    fn series_is_bounded_and_windowed() {
        let mut series = AnalyticsSeries::new(3);
        for i in 0..5 {
            series.push(point(i, EmotionLabel::Neutral, 0.0, 80.0));
        }
        assert_eq!(series.len(), 3);
        let stamps: Vec<_> = series.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps[0], t0() + Duration::seconds(2));
        assert_eq!(series.window(t0() + Duration::seconds(3)).len(), 2);
    }

    #[test]
    fn empty_window_is_no_data() {
        let outcome = build_report(&[], context(t0()));
        assert!(outcome.is_no_data());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({ "error": NO_DATA_MESSAGE }));
    }

    #[test]
    fn summary_counts_emotions_and_extremes() {
        let points = [
            point(0, EmotionLabel::Happy, 10.0, 80.0),
            point(1, EmotionLabel::Neutral, 30.0, 60.0),
            point(2, EmotionLabel::Neutral, 50.0, 70.0),
            point(3, EmotionLabel::Happy, 90.0, 70.0),
        ];
        let window: Vec<&AnalyticsPoint> = points.iter().collect();
        let summary = summarize(&window);
        assert_eq!(summary.dominant_emotion, EmotionLabel::Happy);
        assert_eq!(summary.emotion_diversity, 2);
        assert_eq!(summary.avg_stress, 45.0);
        assert_eq!(summary.max_stress, 90.0);
        assert_eq!(summary.stress_trend, Trend::Increasing);
        assert_eq!(summary.avg_attention, 70.0);
        assert!((summary.attention_stability - (100.0 - 50f64.sqrt())).abs() < 1e-9);
        assert_eq!(summary.adhd_category, AdhdRiskCategory::Low);
    }

    #[test]
    fn stressed_window_produces_insights_and_recommendations() {
        let points: Vec<AnalyticsPoint> = (0..4)
            .map(|i| AnalyticsPoint {
                adhd_risk: 65.0,
                visual_strain: 55.0,
                engagement: 30.0,
                ..point(i, EmotionLabel::Angry, 80.0, 40.0)
            })
            .collect();
        let window: Vec<&AnalyticsPoint> = points.iter().collect();
        let outcome = build_report(&window, context(t0() + Duration::minutes(1)));
        let report = outcome.report().unwrap();

        let kinds: Vec<InsightKind> = report.insights.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InsightKind::Stress,
                InsightKind::Attention,
                InsightKind::Adhd,
                InsightKind::Visual,
                InsightKind::Engagement
            ]
        );
        assert_eq!(
            report.insights[0].message,
            "High average stress level (80.0%). Consider implementing stress reduction techniques."
        );
        assert!(report.insights[2].message.contains("High Risk"));

        let categories: Vec<RecommendationCategory> = report.recommendations.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            vec![
                RecommendationCategory::StressManagement,
                RecommendationCategory::AdhdSupport,
                RecommendationCategory::AttentionImprovement,
                RecommendationCategory::VisualComfort
            ]
        );
        assert!(report.recommendations.iter().take(3).all(|r| r.priority == Priority::High));

        assert_eq!(report.performance_metrics.stress_management, 0.0);
        assert_eq!(report.performance_metrics.visual_comfort, 45.0);
        assert_eq!(report.data_points, 4);
        assert_eq!(report.session_duration_secs, 60.0);
    }

    #[test]
    fn calm_window_has_no_insights() {
        let points: Vec<AnalyticsPoint> = (0..4).map(|i| point(i, EmotionLabel::Happy, 10.0, 80.0)).collect();
        let window: Vec<&AnalyticsPoint> = points.iter().collect();
        let outcome = build_report(&window, context(t0()));
        let report = outcome.report().unwrap();
        assert!(report.insights.is_empty());
        assert!(report.recommendations.is_empty());
        assert_eq!(report.performance_metrics.stress_management, 100.0);
        assert_eq!(report.performance_metrics.attention_consistency, 100.0);
    }

    #[test]
    fn rising_stress_and_erratic_attention_get_medium_insights() {
        let points = [
            point(0, EmotionLabel::Neutral, 10.0, 100.0),
            point(1, EmotionLabel::Neutral, 10.0, 30.0),
            point(2, EmotionLabel::Neutral, 40.0, 100.0),
            point(3, EmotionLabel::Neutral, 40.0, 30.0),
        ];
        let window: Vec<&AnalyticsPoint> = points.iter().collect();
        let summary = summarize(&window);
        assert_eq!(summary.avg_stress, 25.0);
        assert_eq!(summary.stress_trend, Trend::Increasing);
        assert_eq!(summary.avg_attention, 65.0);
        assert!((summary.attention_stability - 65.0).abs() < 1e-9);

        let found = insights(&summary);
        let kinds: Vec<(InsightKind, Priority, InsightAction)> =
            found.iter().map(|i| (i.kind, i.priority, i.action)).collect();
        assert_eq!(
            kinds,
            vec![
                (InsightKind::Stress, Priority::Medium, InsightAction::Monitor),
                (InsightKind::Attention, Priority::Medium, InsightAction::Structure),
            ]
        );
        assert!(found[0].message.starts_with("Stress levels are trending upward"));
        assert!(found[1].message.starts_with("Attention levels are unstable"));
    }

    #[test]
    fn report_context_keeps_last_ten_alerts() {
        let alerts: Vec<Alert> = (0..12)
            .map(|i| {
                let kind = if i % 2 == 0 { AlertKind::HighStress } else { AlertKind::AdhdSupport };
                Alert::new(kind, t0() + Duration::seconds(i))
            })
            .collect();
        let ctx = ReportContext::new(t0() + Duration::minutes(1), t0(), &alerts);
        assert_eq!(ctx.recent_alerts.len(), REPORT_ALERT_LIMIT);
        assert_eq!(ctx.recent_alerts[0].timestamp, t0() + Duration::seconds(2));
        assert_eq!(ctx.critical_events, 6);
    }

    #[test]
    fn trend_analysis_over_raw_samples() {
        let emotions: Vec<EmotionSample> = EmotionLabel::ALL
            .iter()
            .enumerate()
            .map(|(i, &emotion)| EmotionSample {
                emotion,
                confidence: 0.9,
                timestamp: t0() + Duration::seconds(i as i64),
            })
            .collect();
        let attention: Vec<AttentionSample> = [0.2, 0.4, 0.6]
            .iter()
            .enumerate()
            .map(|(i, &score)| AttentionSample {
                score,
                timestamp: t0() + Duration::seconds(i as i64),
            })
            .collect();

        let analysis = analyze_trend(emotions.iter(), attention.iter(), t0() - Duration::minutes(5)).unwrap();
        assert_eq!(analysis.dominant_emotions.len(), 5);
        assert_eq!(analysis.dominant_emotions[4], EmotionLabel::ALL[6]);
        assert_eq!(analysis.engagement_trend, EngagementTrend::Improving);
        assert!((analysis.avg_attention - 0.4).abs() < 1e-12);
        assert!(analysis.recommendations_needed);

        assert!(analyze_trend(emotions.iter(), attention.iter(), t0() + Duration::minutes(1)).is_none());
    }
}
