pub mod batch;
pub mod runner;

pub use batch::{dispatch, BatchDispatcher, BatchSink, DispatchSummary};
pub use runner::{run_once, run_pipeline, RunError, RunReport};
