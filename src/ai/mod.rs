//! AI stub endpoints: the served stub and the client that calls it.

pub mod client;
pub mod service;
pub mod types;
