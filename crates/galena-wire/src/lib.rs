//! # galena-wire: JSON wire protocol for Galena
//!
//! Every datagram on the Galena bus is a single JSON object with a `type`
//! tag. This crate defines the closed message union ([`Message`] / [`Body`])
//! and the datagram codec ([`encode`] / [`decode`]).
//!
//! The union is closed on purpose: a record with an unknown `type` or a
//! missing required field fails to decode and never reaches protocol code,
//! so handlers can't observe partially-formed messages.

mod codec;
mod error;
mod message;

pub use codec::{MAX_DATAGRAM, decode, encode};
pub use error::WireError;
pub use message::{Body, Message};
