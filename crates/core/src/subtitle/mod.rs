pub mod builder;
pub mod chunker;
pub mod entry;
pub mod timestamp;
