pub mod clock;
pub mod image_helper;
pub mod stats;
