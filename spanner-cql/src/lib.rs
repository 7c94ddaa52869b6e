//! Cassandra v4 wire-format types for the Cassandra-to-Spanner proxy.
//!
//! This crate contains just enough of the native protocol to run a
//! protocol-translating proxy: the 9-byte frame header codec, the in-wire
//! primitive types, deserialization of the requests a driver sends, and
//! serialization of the error responses the proxy synthesizes locally.
//! Request and response bodies that the proxy forwards verbatim stay opaque.

pub mod frame;

pub use frame::types::Consistency;
