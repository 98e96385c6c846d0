/// Block Index Mock Server Library
/// 
/// Serves the earliest-block index, fee-level and exchange-rate endpoints
/// a wallet bootstrap talks to, from an in-memory fixture. Used by
/// integration tests and for local development.

pub mod handlers;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use handlers::MockState;
pub use server::{create_router, run_server, spawn_server};
pub use types::*;
