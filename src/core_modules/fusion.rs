// THEORY:
// The `fusion` module is where the independent per-modality signals meet. It
// takes the emotion reading and whatever the eye, head and hand trackers
// produced this frame, and folds them into one `LearningState`.
//
// Key architectural principles:
// 1.  **Partial Data Is Normal**: Any tracker may be silent on a given frame.
//     Every metric has one explicit default-resolution function, so a missing
//     input contributes exactly what the reference heuristics say it should.
// 2.  **Fixed Weighted Formulas**: Each score is a clamped sum of weighted
//     threshold tests. There is no learning and no hidden state beyond the
//     fidget counter, which fusion decays as it reads it.
// 3.  **Two Consumers**: The `LearningState` is what callers see per frame. The
//     `DerivedScores` (ADHD risk, visual strain, cognitive load, all 0-100) feed
//     the alert monitor and the analytics series.

use crate::config::EngineConfig;
use crate::core_modules::eye_tracker::EyeMetrics;
use crate::core_modules::hand_tracker::HandMetrics;
use crate::core_modules::head_tracker::HeadMetrics;
use crate::core_modules::landmarks::{EmotionLabel, EmotionReading};
use crate::core_modules::utils::stats::stats::{clamp01, mean};
use serde::{Deserialize, Serialize};
use tracing::debug;

const VISUAL_RECOMMENDATIONS: [&str; 4] = [
    "Enable high contrast mode",
    "Increase font size",
    "Reduce screen brightness",
    "Enable audio descriptions",
];
const MOTOR_RECOMMENDATIONS: [&str; 4] = [
    "Enable larger click targets",
    "Reduce required precision",
    "Enable voice control",
    "Simplify navigation",
];
const ATTENTION_RECOMMENDATIONS: [&str; 4] = [
    "Reduce visual distractions",
    "Shorter content segments",
    "Frequent breaks",
    "Clear progress indicators",
];
const COGNITIVE_RECOMMENDATIONS: [&str; 4] = [
    "Simplify content presentation",
    "Add calming background music",
    "Suggest break time",
    "Reduce information density",
];
const READING_RECOMMENDATIONS: [&str; 4] = [
    "Use dyslexia-friendly fonts",
    "Increase line spacing",
    "Enable text-to-speech",
    "Add reading guides",
];

/// Sub-score above which a dimension contributes its recommendation block.
const RECOMMENDATION_THRESHOLD: f64 = 0.5;
const COGNITIVE_RECOMMENDATION_THRESHOLD: f64 = 0.6;
/// Mean screen distance below which the learner is considered too close.
const TOO_CLOSE_DISTANCE: f64 = 0.3;
/// Screen distance only counts once more than this many samples exist.
const MIN_DISTANCE_SAMPLES: usize = 5;
const LOW_MOTOR_PRECISION: f64 = 0.7;
const FIDGET_EPISODE_THRESHOLD: u32 = 5;
const ADHD_FIDGET_THRESHOLD: u32 = 3;
/// Neutral attention used when no tracker produced data.
const DEFAULT_ATTENTION: f64 = 0.5;

/// Five accessibility sub-scores in [0, 1] and the suggestions they triggered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccessibilityAssessment {
    pub visual: f64,
    pub motor: f64,
    pub attention: f64,
    pub cognitive_stress: f64,
    pub reading: f64,
    /// Concatenated recommendation blocks, in dimension order. Not deduplicated.
    pub recommendations: Vec<String>,
}

/// The fused assessment for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    pub primary_emotion: EmotionLabel,
    pub emotion_confidence: f64,
    pub stress: f64,
    pub attention: f64,
    pub engagement: f64,
    pub fatigue: f64,
    pub accessibility: AccessibilityAssessment,
}

impl Default for LearningState {
    fn default() -> Self {
        Self {
            primary_emotion: EmotionLabel::Neutral,
            emotion_confidence: 0.0,
            stress: 0.0,
            attention: 0.0,
            engagement: 0.0,
            fatigue: 0.0,
            accessibility: AccessibilityAssessment::default(),
        }
    }
}

/// Engine-internal 0-100 scores computed once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedScores {
    pub adhd_risk: f64,
    pub visual_strain: f64,
    pub cognitive_load: f64,
}

/// What the trackers produced for the current frame.
#[derive(Debug, Clone, Copy)]
pub struct FusionInputs<'a> {
    pub emotion: &'a EmotionReading,
    pub eye: Option<&'a EyeMetrics>,
    pub head: Option<&'a HeadMetrics>,
    pub hand: Option<&'a HandMetrics>,
}

/// Session-level history the accessibility assessment reads.
#[derive(Debug)]
pub struct AssessmentContext<'a> {
    /// Mean of the buffered motor precision scores.
    pub mean_motor_precision: f64,
    /// Mean buffered screen distance, if enough samples exist.
    pub mean_screen_distance: Option<f64>,
    /// The hand tracker's fidget counter; decayed when it triggers.
    pub fidget_count: &'a mut u32,
}

impl AssessmentContext<'_> {
    /// Mean screen distance over `samples`, or `None` with too few samples.
    pub fn screen_distance_from<'s>(samples: impl ExactSizeIterator<Item = &'s f64>) -> Option<f64> {
        if samples.len() <= MIN_DISTANCE_SAMPLES {
            return None;
        }
        Some(mean(samples.copied()))
    }
}

// --- Default resolution, one function per metric ---

fn blink_rate_or_zero(eye: Option<&EyeMetrics>) -> f64 {
    eye.map_or(0.0, |e| e.blink_rate)
}

fn gaze_stability_or_zero(eye: Option<&EyeMetrics>) -> f64 {
    eye.map_or(0.0, |e| e.gaze_stability)
}

fn reading_difficulty_or_false(eye: Option<&EyeMetrics>) -> bool {
    eye.is_some_and(|e| e.reading_difficulty)
}

fn excessive_movement_or_false(head: Option<&HeadMetrics>) -> bool {
    head.is_some_and(|h| h.excessive_movement)
}

fn fidgeting_or_false(hand: Option<&HandMetrics>) -> bool {
    hand.is_some_and(|h| h.fidgeting)
}

fn tremor_or_false(hand: Option<&HandMetrics>) -> bool {
    hand.is_some_and(|h| h.tremor_detected)
}

/// Visual strain assumes a healthy blink rate when the eyes were not seen.
fn blink_rate_or_optimal(eye: Option<&EyeMetrics>, optimal: f64) -> f64 {
    eye.map_or(optimal, |e| e.blink_rate)
}

const BASELINE_GAZE_STABILITY: f64 = 0.05;

fn gaze_stability_or_baseline(eye: Option<&EyeMetrics>) -> f64 {
    eye.map_or(BASELINE_GAZE_STABILITY, |e| e.gaze_stability)
}

/// Motor precision recorded in analytics when no hand was seen.
pub fn motor_precision_or_full(hand: Option<&HandMetrics>) -> f64 {
    hand.map_or(1.0, |h| h.motor_precision)
}

/// Stateless scoring rules, parameterized by the engine config.
#[derive(Debug, Clone)]
pub struct StateFusion {
    optimal_blink_rate: f64,
    high_blink_rate: f64,
    low_blink_rate: f64,
    gaze_threshold: f64,
    head_movement_threshold: f64,
}

impl StateFusion {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            optimal_blink_rate: config.optimal_blink_rate,
            high_blink_rate: config.high_blink_rate,
            low_blink_rate: config.low_blink_rate,
            gaze_threshold: config.gaze_instability_threshold,
            head_movement_threshold: config.head_movement_threshold,
        }
    }

    /// Fuses one frame into a `LearningState`.
    pub fn fuse(&self, inputs: &FusionInputs<'_>, context: &mut AssessmentContext<'_>) -> LearningState {
        let scores = &inputs.emotion.scores;

        let stress = clamp01(scores.distress_sum() / 100.0);
        let attention = self.attention(inputs);
        let engagement = clamp01(scores.positive_sum() / 100.0 * 0.7 + attention * 0.3);

        let blink_rate = blink_rate_or_zero(inputs.eye);
        let mut fatigue = 0.0;
        if blink_rate > self.high_blink_rate {
            fatigue += 0.3;
        }
        if scores.sad > 50.0 {
            fatigue += 0.2;
        }
        if attention < 0.3 {
            fatigue += 0.2;
        }

        LearningState {
            primary_emotion: inputs.emotion.label,
            emotion_confidence: inputs.emotion.confidence,
            stress,
            attention,
            engagement,
            fatigue: clamp01(fatigue),
            accessibility: self.assess_accessibility(inputs, context),
        }
    }

    /// Mean of the attention factors available this frame.
    fn attention(&self, inputs: &FusionInputs<'_>) -> f64 {
        let mut factors = Vec::with_capacity(3);

        if let Some(eye) = inputs.eye.filter(|e| e.blink_rate > 0.0) {
            let deviation = (eye.blink_rate - self.optimal_blink_rate).abs() / self.optimal_blink_rate;
            factors.push((1.0 - deviation).max(0.0));
        }
        if let Some(head) = inputs.head {
            factors.push(if head.excessive_movement { 0.3 } else { 0.8 });
        }
        if let Some(hand) = inputs.hand {
            factors.push(if hand.fidgeting { 0.4 } else { 0.8 });
        }

        if factors.is_empty() {
            DEFAULT_ATTENTION
        } else {
            mean(factors)
        }
    }

    fn assess_accessibility(
        &self,
        inputs: &FusionInputs<'_>,
        context: &mut AssessmentContext<'_>,
    ) -> AccessibilityAssessment {
        let blink_rate = blink_rate_or_zero(inputs.eye);

        let mut visual = 0.0;
        if reading_difficulty_or_false(inputs.eye) {
            visual += 0.3;
        }
        if blink_rate > self.high_blink_rate {
            visual += 0.2;
        }
        if context.mean_screen_distance.is_some_and(|d| d < TOO_CLOSE_DISTANCE) {
            visual += 0.2;
        }

        let mut motor = 0.0;
        if context.mean_motor_precision < LOW_MOTOR_PRECISION {
            motor += 0.4;
        }
        if tremor_or_false(inputs.hand) {
            motor += 0.3;
        }

        let mut attention = 0.0;
        if excessive_movement_or_false(inputs.head) {
            attention += 0.3;
        }
        if fidgeting_or_false(inputs.hand) {
            attention += 0.3;
        }
        if *context.fidget_count > FIDGET_EPISODE_THRESHOLD {
            attention += 0.2;
            *context.fidget_count -= 1;
        }

        let cognitive_stress = clamp01(inputs.emotion.scores.distress_sum() / 100.0);

        let mut reading = 0.0;
        if gaze_stability_or_zero(inputs.eye) > self.gaze_threshold {
            reading += 0.4;
        }
        if blink_rate < self.low_blink_rate {
            reading += 0.2;
        }

        let mut assessment = AccessibilityAssessment {
            visual: clamp01(visual),
            motor: clamp01(motor),
            attention: clamp01(attention),
            cognitive_stress,
            reading: clamp01(reading),
            recommendations: Vec::new(),
        };
        assessment.recommendations = recommendations_for(&assessment);
        assessment
    }

    /// ADHD-risk indicator, 0-100.
    pub fn adhd_risk(&self, state: &LearningState, fidget_count: u32, head_movement_variance: f64) -> f64 {
        let mut score = state.accessibility.attention * 40.0;
        if fidget_count > ADHD_FIDGET_THRESHOLD {
            score += 20.0;
        }
        if head_movement_variance > self.head_movement_threshold {
            score += 25.0;
        }
        if state.attention < 0.4 {
            score += 15.0;
        }
        score.min(100.0)
    }

    /// Visual strain indicator, 0-100.
    pub fn visual_strain(&self, eye: Option<&EyeMetrics>) -> f64 {
        let mut strain: f64 = 0.0;
        let blink_rate = blink_rate_or_optimal(eye, self.optimal_blink_rate);
        if blink_rate > self.high_blink_rate || blink_rate < self.low_blink_rate {
            strain += 30.0;
        }
        if reading_difficulty_or_false(eye) {
            strain += 40.0;
        }
        if gaze_stability_or_baseline(eye) > self.gaze_threshold {
            strain += 30.0;
        }
        strain.min(100.0)
    }

    /// Cognitive load indicator, 0-100.
    pub fn cognitive_load(&self, state: &LearningState) -> f64 {
        let mut load = state.stress * 40.0 + state.fatigue * 30.0;
        if state.attention < 0.5 {
            load += 30.0;
        }
        load.min(100.0)
    }

    pub fn derive_scores(
        &self,
        state: &LearningState,
        eye: Option<&EyeMetrics>,
        fidget_count: u32,
        head_movement_variance: f64,
    ) -> DerivedScores {
        DerivedScores {
            adhd_risk: self.adhd_risk(state, fidget_count, head_movement_variance),
            visual_strain: self.visual_strain(eye),
            cognitive_load: self.cognitive_load(state),
        }
    }
}

fn recommendations_for(assessment: &AccessibilityAssessment) -> Vec<String> {
    let blocks: [(&str, bool, &[&str; 4]); 5] = [
        ("visual", assessment.visual > RECOMMENDATION_THRESHOLD, &VISUAL_RECOMMENDATIONS),
        ("motor", assessment.motor > RECOMMENDATION_THRESHOLD, &MOTOR_RECOMMENDATIONS),
        ("attention", assessment.attention > RECOMMENDATION_THRESHOLD, &ATTENTION_RECOMMENDATIONS),
        (
            "cognitive",
            assessment.cognitive_stress > COGNITIVE_RECOMMENDATION_THRESHOLD,
            &COGNITIVE_RECOMMENDATIONS,
        ),
        ("reading", assessment.reading > RECOMMENDATION_THRESHOLD, &READING_RECOMMENDATIONS),
    ];

    let mut recommendations = Vec::new();
    for (dimension, triggered, block) in blocks {
        if triggered {
            debug!(dimension, "accessibility recommendations added");
            recommendations.extend(block.iter().map(|s| s.to_string()));
        }
    }
    recommendations
}
