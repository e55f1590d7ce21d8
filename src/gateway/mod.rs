//! Remote data gateway: the hosted store of record and this client's view of
//! it.
//!
//! `client` speaks the gateway's REST interface; `cached_client` routes reads
//! through the cache layer; `mutations` performs writes and invalidates what
//! they affect; `realtime` follows per-fountain reading inserts.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod mutations;
pub mod realtime;
pub mod types;
