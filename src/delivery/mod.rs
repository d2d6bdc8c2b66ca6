pub mod destination;
pub mod sender;

pub use destination::{Destination, DestinationKind};
pub use sender::{CaliperSender, DeliveryError, DeliveryOutcome};
