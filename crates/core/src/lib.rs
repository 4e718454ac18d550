pub mod job;
pub mod media;
pub mod progress;
pub mod recognition;
pub mod shared;
pub mod subtitle;
