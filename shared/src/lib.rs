//! Types shared between the cosmic server and its clients.

pub mod config;
pub mod protocol;
