pub mod config;
pub mod coordinator;
pub mod messages;
pub mod sink;
pub mod worker;
