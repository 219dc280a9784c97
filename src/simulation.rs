// THEORY:
// Demo and test data. Two generators live here:
//
// - `simulate_demo_data` produces pre-fused observations (random but plausible
//   learning states) and pushes them through the engine's analytics and alert
//   path, twelve per simulated minute. It is the only unbounded loop in the
//   crate, so it checks a shared `StopFlag` on every iteration.
// - `SyntheticFrames` produces complete `FrameInput`s, with landmarks and
//   emotion vectors, so the whole per-frame pipeline can be exercised without
//   a camera or any perception model.
//
// `synthetic_face` and `synthetic_hand` build landmark sets with exactly known
// geometry (a chosen EAR, nose position and tilt; a chosen fingertip centroid),
// which is what the analyzer tests rely on.

use crate::core_modules::eye_tracker::EyeMetrics;
use crate::core_modules::fusion::{AccessibilityAssessment, LearningState};
use crate::core_modules::landmarks::{
    CHIN, EmotionLabel, EmotionReading, EmotionVector, FACE_MESH_POINTS, FINGERTIP_INDICES, FaceLandmarks,
    HAND_POINTS, HandLandmarks, LEFT_EAR, LEFT_EYE_INDICES, LandmarkPoint, NOSE_TIP, RIGHT_EAR,
    RIGHT_EYE_INDICES,
};
use crate::pipeline::{Engine, FrameInput, Observation};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Simulated observations per minute.
pub const DEMO_POINTS_PER_MINUTE: u32 = 12;
/// Spacing of simulated observations.
const DEMO_INTERVAL_SECS: i64 = 5;
/// Emotions the demo generator draws from.
const DEMO_EMOTIONS: [EmotionLabel; 6] = [
    EmotionLabel::Happy,
    EmotionLabel::Neutral,
    EmotionLabel::Neutral,
    EmotionLabel::Fear,
    EmotionLabel::Surprise,
    EmotionLabel::Sad,
];

const EYE_WIDTH: f64 = 0.1;
const EAR_EPSILON: f64 = 1e-6;

/// Cooperative cancellation flag shared between a controller and a long-running loop.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Parameters of a synthetic face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceSpec {
    /// Eye-aspect-ratio of both eyes.
    pub ear: f64,
    pub nose: LandmarkPoint,
    /// Head roll in radians.
    pub tilt: f64,
}

impl Default for FaceSpec {
    fn default() -> Self {
        Self {
            ear: 0.3,
            nose: LandmarkPoint::new(0.5, 0.5),
            tilt: 0.0,
        }
    }
}

/// Writes the six EAR points of one eye, starting at its outer corner.
fn place_eye(points: &mut [LandmarkPoint], indices: &[usize], corner: LandmarkPoint, ear: f64) {
    let h = ear * (2.0 * EYE_WIDTH + EAR_EPSILON) / 2.0;
    let offsets = [
        (0.0, 0.0),
        (EYE_WIDTH / 3.0, -h / 2.0),
        (2.0 * EYE_WIDTH / 3.0, -h / 2.0),
        (EYE_WIDTH, 0.0),
        (2.0 * EYE_WIDTH / 3.0, h / 2.0),
        (EYE_WIDTH / 3.0, h / 2.0),
    ];
    for (&index, (dx, dy)) in indices.iter().zip(offsets) {
        points[index] = LandmarkPoint::new(corner.x + dx, corner.y + dy);
    }
}

/// A full 468-point face mesh with the requested eye openness, position and tilt.
pub fn synthetic_face(spec: &FaceSpec) -> FaceLandmarks {
    let mut points = vec![LandmarkPoint::new(0.5, 0.5); FACE_MESH_POINTS];
    let nose = spec.nose;

    let left_corner = LandmarkPoint::new(nose.x - 0.2, nose.y - 0.1);
    let right_corner = LandmarkPoint::new(nose.x + 0.1, nose.y - 0.1 + 0.3 * spec.tilt.tan());
    place_eye(&mut points, &LEFT_EYE_INDICES, left_corner, spec.ear);
    place_eye(&mut points, &RIGHT_EYE_INDICES, right_corner, spec.ear);

    points[NOSE_TIP] = nose;
    points[CHIN] = LandmarkPoint::new(nose.x, nose.y + 0.15);
    points[LEFT_EAR] = LandmarkPoint::new(nose.x - 0.25, nose.y);
    points[RIGHT_EAR] = LandmarkPoint::new(nose.x + 0.25, nose.y);

    FaceLandmarks::new(points)
}

/// A 21-point hand whose fingertip centroid is exactly `centroid`.
pub fn synthetic_hand(centroid: LandmarkPoint, spread: f64) -> HandLandmarks {
    let mut points = vec![LandmarkPoint::new(centroid.x, centroid.y + spread); HAND_POINTS];
    let offsets = [(-spread, 0.0), (-spread / 2.0, -spread), (0.0, 0.0), (spread / 2.0, -spread), (spread, 2.0 * spread)];
    for (&index, (dx, dy)) in FINGERTIP_INDICES.iter().zip(offsets) {
        points[index] = LandmarkPoint::new(centroid.x + dx, centroid.y + dy);
    }
    HandLandmarks::new(points)
}

fn demo_observation(rng: &mut impl Rng, timestamp: DateTime<Utc>) -> Observation {
    let emotion = DEMO_EMOTIONS.choose(rng).copied().unwrap_or(EmotionLabel::Neutral);
    let state = LearningState {
        primary_emotion: emotion,
        emotion_confidence: rng.gen_range(0.6..0.95),
        stress: rng.gen_range(0.1..0.8),
        attention: rng.gen_range(0.3..0.9),
        engagement: rng.gen_range(0.2..0.85),
        fatigue: rng.gen_range(0.1..0.7),
        accessibility: AccessibilityAssessment {
            visual: rng.gen_range(0.0..0.5),
            motor: rng.gen_range(0.0..0.4),
            attention: rng.gen_range(0.0..0.6),
            cognitive_stress: rng.gen_range(0.1..0.7),
            reading: rng.gen_range(0.0..0.3),
            recommendations: Vec::new(),
        },
    };
    let eye = EyeMetrics {
        blink_rate: f64::from(rng.gen_range(10u32..25)),
        eye_aspect_ratio: 0.3,
        gaze_stability: rng.gen_range(0.02..0.15),
        reading_difficulty: rng.gen_bool(0.2),
        blink_detected: false,
    };
    Observation {
        state,
        eye: Some(eye),
        motor_precision: rng.gen_range(0.6..1.0),
        timestamp,
    }
}

/// Feeds `duration_minutes` of simulated observations into `engine`, the last one
/// stamped at the engine clock's current time. Returns the number generated.
pub fn simulate_demo_data_with_rng(
    engine: &mut Engine,
    duration_minutes: u32,
    stop: &StopFlag,
    rng: &mut impl Rng,
) -> usize {
    let total = (duration_minutes * DEMO_POINTS_PER_MINUTE) as i64;
    let end = engine.now();
    info!(duration_minutes, points = total, "demo simulation started");

    let mut generated = 0;
    for i in 0..total {
        if stop.is_raised() {
            info!(generated, "demo simulation stopped early");
            return generated;
        }
        let timestamp = end - Duration::seconds(DEMO_INTERVAL_SECS * (total - 1 - i));
        engine.record_observation(&demo_observation(rng, timestamp));
        generated += 1;
    }

    info!(generated, "demo simulation finished");
    generated
}

pub fn simulate_demo_data(engine: &mut Engine, duration_minutes: u32, stop: &StopFlag) -> usize {
    simulate_demo_data_with_rng(engine, duration_minutes, stop, &mut rand::thread_rng())
}

/// Endless, seeded stream of plausible frames.
#[derive(Debug, Clone)]
pub struct SyntheticFrames {
    rng: StdRng,
    next_at: DateTime<Utc>,
    interval: Duration,
}

impl SyntheticFrames {
    pub fn new(seed: u64, start: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_at: start,
            interval,
        }
    }

    fn emotion(&mut self) -> EmotionReading {
        let dominant = *DEMO_EMOTIONS.choose(&mut self.rng).unwrap_or(&EmotionLabel::Neutral);
        let mut scores = EmotionVector::default();
        let mut remaining: f64 = 100.0;
        for label in EmotionLabel::ALL {
            let share = if label == dominant {
                self.rng.gen_range(50.0..80.0)
            } else {
                self.rng.gen_range(0.0..8.0)
            };
            scores.set(label, share);
            remaining -= share;
        }
        scores.set(dominant, scores.get(dominant) + remaining.max(0.0));
        EmotionReading::from_scores(scores)
    }
}

impl Iterator for SyntheticFrames {
    type Item = FrameInput;

    fn next(&mut self) -> Option<FrameInput> {
        let timestamp = self.next_at;
        self.next_at += self.interval;

        let emotion = self.emotion();
        let mut input = FrameInput::new(emotion, timestamp);

        if self.rng.gen_bool(0.9) {
            let ear = if self.rng.gen_bool(0.1) {
                self.rng.gen_range(0.1..0.2)
            } else {
                self.rng.gen_range(0.27..0.33)
            };
            let nose = LandmarkPoint::new(0.5 + self.rng.gen_range(-0.03..0.03), 0.5 + self.rng.gen_range(-0.03..0.03));
            let tilt = self.rng.gen_range(-0.1..0.1);
            input = input.with_face(synthetic_face(&FaceSpec { ear, nose, tilt }));
        }

        let hand_count = self.rng.gen_range(0..=2);
        let hands = (0..hand_count)
            .map(|i| {
                let centroid = LandmarkPoint::new(
                    0.3 + 0.4 * i as f64 + self.rng.gen_range(-0.04..0.04),
                    0.7 + self.rng.gen_range(-0.04..0.04),
                );
                synthetic_hand(centroid, 0.05)
            })
            .collect();
        input = input.with_hands(hands);

        if self.rng.gen_bool(0.5) {
            input = input.with_screen_distance(self.rng.gen_range(0.2..0.6));
        }

        Some(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core_modules::eye_tracker::eye_aspect_ratio;
    use crate::core_modules::utils::clock::ManualClock;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn engine(clock: &ManualClock) -> Engine {
        Engine::with_clock(EngineConfig::default(), Arc::new(clock.clone())).unwrap()
    }

    #[test]
    fn synthetic_face_has_requested_ear() {
        let face = synthetic_face(&FaceSpec {
            ear: 0.2,
            ..FaceSpec::default()
        });
        assert_eq!(face.len(), FACE_MESH_POINTS);
        let left = eye_aspect_ratio(&face.select(&LEFT_EYE_INDICES)).unwrap();
        let right = eye_aspect_ratio(&face.select(&RIGHT_EYE_INDICES)).unwrap();
        assert!((left - 0.2).abs() < 1e-9);
        assert!((right - 0.2).abs() < 1e-9);
    }

    #[test]
    fn synthetic_hand_centroid_is_exact() {
        let centroid = LandmarkPoint::new(0.42, 0.61);
        let hand = synthetic_hand(centroid, 0.05);
        let measured = hand.fingertip_centroid().unwrap();
        assert!((measured.x - centroid.x).abs() < 1e-12);
        assert!((measured.y - centroid.y).abs() < 1e-12);
    }

    #[test]
    fn demo_generates_twelve_points_per_minute() {
        let clock = ManualClock::new(t0());
        let mut engine = engine(&clock);
        let mut rng = StdRng::seed_from_u64(7);
        let generated = simulate_demo_data_with_rng(&mut engine, 3, &StopFlag::new(), &mut rng);
        assert_eq!(generated, 36);
        assert_eq!(engine.series().len(), 36);
        assert_eq!(engine.series().latest().map(|p| p.timestamp), Some(t0()));
        assert_eq!(
            engine.series().iter().next().map(|p| p.timestamp),
            Some(t0() - Duration::seconds(35 * 5))
        );
        assert!(!engine.report(1.0).is_no_data());
    }

    #[test]
    fn raised_flag_stops_the_demo() {
        let clock = ManualClock::new(t0());
        let mut engine = engine(&clock);
        let stop = StopFlag::new();
        stop.raise();
        assert_eq!(simulate_demo_data(&mut engine, 5, &stop), 0);
        assert!(engine.series().is_empty());
    }

    #[test]
    fn synthetic_frames_are_reproducible() {
        let a: Vec<FrameInput> = SyntheticFrames::new(11, t0(), Duration::milliseconds(100)).take(20).collect();
        let b: Vec<FrameInput> = SyntheticFrames::new(11, t0(), Duration::milliseconds(100)).take(20).collect();
        assert_eq!(a, b);
        assert_eq!(a[19].timestamp, t0() + Duration::milliseconds(1900));
        assert!(a.iter().all(|f| f.emotion.scores.get(f.emotion.label) >= 50.0));
    }

    #[test]
    fn synthetic_frames_drive_the_engine() {
        let clock = ManualClock::new(t0());
        let mut engine = engine(&clock);
        for frame in SyntheticFrames::new(3, t0(), Duration::milliseconds(200)).take(200) {
            let state = engine.process_frame(&frame);
            assert!((0.0..=1.0).contains(&state.attention));
            assert!((0.0..=1.0).contains(&state.engagement));
        }
        assert_eq!(engine.series().len(), 200);
        assert!(engine.eye_tracker().blink_count() > 0);
    }
}
