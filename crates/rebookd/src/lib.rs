//! rebookd HTTP surface
//!
//! The router, its handlers and the error-to-response mapping live in the
//! library half of the crate so integration tests can drive them without a
//! socket. `main.rs` only wires configuration, storage and the listener.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;
