//! # Domain Module
//!
//! Core state of the relay engine: adapter registry, confirmation,
//! fee and delivery ledgers, call context, events and errors.

pub mod batch;
pub mod confirmations;
pub mod deliveries;
pub mod entities;
pub mod errors;
pub mod events;
pub mod fees;
pub mod invariants;
pub mod registry;
pub mod value_objects;

pub use batch::{BatchSession, CallContext};
pub use confirmations::ConfirmationLedger;
pub use deliveries::{split_messages, DeliveryLedger};
pub use entities::*;
pub use errors::*;
pub use events::{RelayEvent, RoundId};
pub use fees::{FeeLedger, Payment};
pub use invariants::*;
pub use registry::AdapterRegistry;
pub use value_objects::*;
