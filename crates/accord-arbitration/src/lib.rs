//! # accord-arbitration: Arbitration Adapter
//!
//! The protocol's side of dispute resolution. How disputes are adjudicated is
//! the external service's business; this crate covers what the protocol
//! needs from it:
//!
//! - **Service** ([`service`]): the [`Arbitrator`] trait for fee quotes,
//!   opening disputes and forwarding evidence.
//!
//! - **Fees** ([`fees`]): how the challenger's escrowed half and the
//!   submitter's contribution combine into the arbitrator's fee.
//!
//! - **Memory** ([`memory`]): [`InMemoryArbitrator`], a recording service
//!   with fee changes and failure injection.

pub mod error;
pub mod fees;
pub mod memory;
pub mod service;

pub use error::ArbitrationError;
pub use fees::FeePlan;
pub use memory::{DisputeRecord, FailurePlan, InMemoryArbitrator, ReceivedEvidence};
pub use service::{Arbitrator, DisputeFees, DisputeMetadata, POSSIBLE_RULINGS};
