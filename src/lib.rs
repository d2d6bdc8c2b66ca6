pub mod cli;
pub mod config;
pub mod delivery;
pub mod envelope;
pub mod pipeline;
pub mod storage;
