//! High-level operations built on the protocol crates.

pub mod submit;

pub use submit::{OutgoingMessage, send_email, submit};
