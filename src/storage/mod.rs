pub mod duckdb;
pub mod traits;
pub mod watermark;

pub use traits::{EventSource, JobWatermark, RawEvent, StorageError, WatermarkStore};
pub use watermark::WatermarkTracker;
