// netdiag-api: Async Rust client for the netdiag analysis service
//
// One `ApiClient` owns the HTTP transport and the bearer credential slot.
// Endpoint groups (session, analysis, repair) are implemented as inherent
// methods in separate files so this crate stays a thin transport layer.

pub mod analysis;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod repair;
pub mod session;
pub mod transport;

pub use auth::{Credential, ResponseInterceptor};
pub use client::ApiClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
