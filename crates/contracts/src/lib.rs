//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Size Model
//! - A record's size is the length of its serialized JSON
//! - A batch's size is the length of the JSON array holding its records

mod config;
mod error;
mod message;
mod record;
mod sink;
mod transport;

pub use config::*;
pub use error::*;
pub use message::*;
pub use record::*;
pub use sink::*;
pub use transport::*;
