// THEORY:
// Face landmarks, hand landmarks and emotion scores come from external models
// the engine does not own. Each of them sits behind a small trait so any
// backend (a native model, a remote service, a test stub) can be plugged in.
//
// `Perception` runs the three collaborators over one image and produces a
// `FrameInput`. A failing collaborator never fails the frame: a face or hand
// detector error is logged and treated as "nothing detected", and a failed
// emotion classification falls back to a neutral reading with zero confidence.

use crate::core_modules::landmarks::{EmotionReading, FaceLandmarks, HandLandmarks};
use crate::core_modules::utils::image_helper::image_helper;
use crate::error::CollaboratorError;
use crate::pipeline::FrameInput;
use chrono::{DateTime, Utc};
use image::RgbImage;
use tracing::warn;

/// Produces the 468-point face mesh for the most prominent face, if any.
pub trait FaceLandmarkDetector: Send {
    fn detect_face(&mut self, image: &RgbImage) -> Result<Option<FaceLandmarks>, CollaboratorError>;
}

/// Produces a 21-point landmark set for every visible hand.
pub trait HandLandmarkDetector: Send {
    fn detect_hands(&mut self, image: &RgbImage) -> Result<Vec<HandLandmarks>, CollaboratorError>;
}

/// Classifies the learner's facial expression.
pub trait EmotionClassifier: Send {
    fn classify(&mut self, image: &RgbImage) -> Result<EmotionReading, CollaboratorError>;
}

pub struct Perception {
    face: Box<dyn FaceLandmarkDetector>,
    hands: Box<dyn HandLandmarkDetector>,
    emotion: Box<dyn EmotionClassifier>,
}

impl Perception {
    pub fn new(
        face: Box<dyn FaceLandmarkDetector>,
        hands: Box<dyn HandLandmarkDetector>,
        emotion: Box<dyn EmotionClassifier>,
    ) -> Self {
        Self { face, hands, emotion }
    }

    /// Runs every collaborator over `image`.
    pub fn perceive(&mut self, image: &RgbImage, timestamp: DateTime<Utc>) -> FrameInput {
        let emotion = self.emotion.classify(image).unwrap_or_else(|err| {
            warn!(error = %err, "emotion classification failed, using neutral reading");
            EmotionReading::neutral_fallback()
        });

        let face = self.face.detect_face(image).unwrap_or_else(|err| {
            warn!(error = %err, "face detection failed");
            None
        });

        let hands = self.hands.detect_hands(image).unwrap_or_else(|err| {
            warn!(error = %err, "hand detection failed");
            Vec::new()
        });

        let mut input = FrameInput::new(emotion, timestamp).with_hands(hands);
        if let Some(face) = face {
            input = input.with_face(face);
        }
        input
    }

    /// Same as `perceive`, starting from a raw RGBA camera buffer.
    pub fn perceive_rgba(
        &mut self,
        width: u32,
        height: u32,
        buffer: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<FrameInput, CollaboratorError> {
        let image = image_helper::rgb_from_rgba(width, height, buffer).ok_or(CollaboratorError::InvalidFrame {
            expected: image_helper::rgba_len(width, height),
            actual: buffer.len(),
        })?;
        Ok(self.perceive(&image, timestamp))
    }

    /// Same as `perceive`, starting from a BGR buffer in OpenCV channel order.
    pub fn perceive_bgr(
        &mut self,
        width: u32,
        height: u32,
        buffer: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<FrameInput, CollaboratorError> {
        let image = image_helper::rgb_from_bgr(width, height, buffer).ok_or(CollaboratorError::InvalidFrame {
            expected: (width as usize) * (height as usize) * 3,
            actual: buffer.len(),
        })?;
        Ok(self.perceive(&image, timestamp))
    }
}
