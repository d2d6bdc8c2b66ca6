pub mod caliper;
pub mod translate;

pub use caliper::{Action, CaliperEvent, EventKind, SensorEnvelope};
pub use translate::{translate, ResourceIdentity, TranslationRule, TranslationTable, Translator};
