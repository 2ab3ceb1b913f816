// vela-api: Async HTTP client for paged remote record collections.
//
// This crate is the transport-layer collaborator of `vela-core`: it knows
// how to talk to a remote collection endpoint (offset/limit paging, the
// camelCase page envelope, raw collection pulls) and nothing about the
// local store. Retry and auth policy belong to the embedding application.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::RemoteClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{IdRecord, Page};
