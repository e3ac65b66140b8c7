// exported modules
pub mod error;
pub mod model;

// client impls
pub mod client;

// re-exports
pub use client::ExecutionServiceClient;
pub use error::*;
pub use model::*;

// internal modules
mod http;
