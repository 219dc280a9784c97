pub mod alerts;
pub mod analytics;
pub mod collaborators;
pub mod eye_tracker;
pub mod fusion;
pub mod hand_tracker;
pub mod head_tracker;
pub mod history;
pub mod landmarks;
pub mod utils;
