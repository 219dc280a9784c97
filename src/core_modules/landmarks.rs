// THEORY:
// The `landmarks` module defines the per-frame vocabulary the engine receives
// from its external perception collaborators. These are "dumb" data
// containers: a face mesh, a set of hands, and an emotion probability vector.
// They know how to index themselves by semantic position (an eye corner, a
// fingertip, the dominant emotion) but carry no temporal state. Every value
// here lives for exactly one frame and is consumed by the analyzers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of points in a face-mesh result.
pub const FACE_MESH_POINTS: usize = 468;
/// Number of points in a hand result.
pub const HAND_POINTS: usize = 21;

/// Left eye contour. The first six entries are the EAR points
/// (outer corner, two upper-lid points, inner corner, two lower-lid points).
pub const LEFT_EYE_INDICES: [usize; 16] = [
    33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
];
/// Right eye contour, same ordering convention as the left eye.
pub const RIGHT_EYE_INDICES: [usize; 16] = [
    362, 382, 381, 380, 374, 373, 390, 249, 263, 466, 388, 387, 386, 385, 384, 398,
];

pub const NOSE_TIP: usize = 1;
pub const CHIN: usize = 18;
pub const LEFT_EYE_CORNER: usize = 33;
pub const RIGHT_EYE_CORNER: usize = 362;
pub const LEFT_EAR: usize = 234;
pub const RIGHT_EAR: usize = 454;

/// Thumb, index, middle, ring and pinky tips.
pub const FINGERTIP_INDICES: [usize; 5] = [4, 8, 12, 16, 20];

/// A normalized (x, y) image coordinate in [0,1] x [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &LandmarkPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// The mean position of a set of points, or `None` for an empty set.
    pub fn centroid(points: &[LandmarkPoint]) -> Option<LandmarkPoint> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(LandmarkPoint::new(sx / n, sy / n))
    }
}

/// One face-mesh result: an ordered list of points indexed by the mesh layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceLandmarks {
    pub points: Vec<LandmarkPoint>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn get(&self, index: usize) -> Option<LandmarkPoint> {
        self.points.get(index).copied()
    }

    /// Collects the points at `indices`, skipping any index the mesh does not contain.
    pub fn select(&self, indices: &[usize]) -> Vec<LandmarkPoint> {
        indices.iter().filter_map(|&i| self.get(i)).collect()
    }

    /// The points at `indices` in order, or `None` if the mesh lacks any of them.
    pub fn resolve(&self, indices: &[usize]) -> Option<Vec<LandmarkPoint>> {
        indices.iter().map(|&i| self.get(i)).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One hand result: 21 points in the standard hand-landmark layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandLandmarks {
    pub points: Vec<LandmarkPoint>,
}

impl HandLandmarks {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    /// The five fingertip points, or `None` if the hand is missing any of them.
    pub fn fingertips(&self) -> Option<[LandmarkPoint; 5]> {
        let mut tips = [LandmarkPoint::default(); 5];
        for (slot, &index) in tips.iter_mut().zip(FINGERTIP_INDICES.iter()) {
            *slot = *self.points.get(index)?;
        }
        Some(tips)
    }

    /// Mean fingertip position.
    pub fn fingertip_centroid(&self) -> Option<LandmarkPoint> {
        self.fingertips().and_then(|tips| LandmarkPoint::centroid(&tips))
    }
}

/// The fixed label set of the emotion classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fear,
    Surprise,
    Disgust,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 7] = [
        EmotionLabel::Neutral,
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Angry,
        EmotionLabel::Fear,
        EmotionLabel::Surprise,
        EmotionLabel::Disgust,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Angry => "angry",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Disgust => "disgust",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmotionLabel::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown emotion label: {s}"))
    }
}

/// Classifier confidence per label, each in [0, 100]. Labels the classifier
/// did not report are 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionVector {
    pub neutral: f64,
    pub happy: f64,
    pub sad: f64,
    pub angry: f64,
    pub fear: f64,
    pub surprise: f64,
    pub disgust: f64,
}

impl EmotionVector {
    pub fn from_pairs(pairs: &[(EmotionLabel, f64)]) -> Self {
        let mut vector = Self::default();
        for &(label, confidence) in pairs {
            vector.set(label, confidence);
        }
        vector
    }

    pub fn get(&self, label: EmotionLabel) -> f64 {
        match label {
            EmotionLabel::Neutral => self.neutral,
            EmotionLabel::Happy => self.happy,
            EmotionLabel::Sad => self.sad,
            EmotionLabel::Angry => self.angry,
            EmotionLabel::Fear => self.fear,
            EmotionLabel::Surprise => self.surprise,
            EmotionLabel::Disgust => self.disgust,
        }
    }

    pub fn set(&mut self, label: EmotionLabel, confidence: f64) {
        let slot = match label {
            EmotionLabel::Neutral => &mut self.neutral,
            EmotionLabel::Happy => &mut self.happy,
            EmotionLabel::Sad => &mut self.sad,
            EmotionLabel::Angry => &mut self.angry,
            EmotionLabel::Fear => &mut self.fear,
            EmotionLabel::Surprise => &mut self.surprise,
            EmotionLabel::Disgust => &mut self.disgust,
        };
        *slot = confidence;
    }

    /// The highest-confidence label. Ties resolve to the earlier label in `EmotionLabel::ALL`.
    pub fn dominant(&self) -> EmotionLabel {
        EmotionLabel::ALL
            .into_iter()
            .fold(EmotionLabel::Neutral, |best, label| {
                if self.get(label) > self.get(best) { label } else { best }
            })
    }

    /// angry + fear + sad, in percent.
    pub fn distress_sum(&self) -> f64 {
        self.angry + self.fear + self.sad
    }

    /// happy + surprise, in percent.
    pub fn positive_sum(&self) -> f64 {
        self.happy + self.surprise
    }
}

/// The classifier's verdict for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionReading {
    pub label: EmotionLabel,
    /// Confidence of `label` in [0, 1].
    pub confidence: f64,
    pub scores: EmotionVector,
}

impl EmotionReading {
    pub fn new(label: EmotionLabel, confidence: f64, scores: EmotionVector) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
            scores,
        }
    }

    /// Builds a reading whose label is the dominant entry of `scores`.
    pub fn from_scores(scores: EmotionVector) -> Self {
        let label = scores.dominant();
        Self::new(label, scores.get(label) / 100.0, scores)
    }

    /// The reading used when classification fails: neutral at 100% with zero confidence.
    pub fn neutral_fallback() -> Self {
        Self::new(
            EmotionLabel::Neutral,
            0.0,
            EmotionVector::from_pairs(&[(EmotionLabel::Neutral, 100.0)]),
        )
    }
}

impl Default for EmotionReading {
    fn default() -> Self {
        Self::from_scores(EmotionVector::from_pairs(&[(EmotionLabel::Neutral, 100.0)]))
    }
}
