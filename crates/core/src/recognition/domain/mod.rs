pub mod model;
pub mod segment;
pub mod speech_engine;
