//! PACIFIC REST server
//!
//! HTTP front end for the `lessons` pipeline: lesson generation, the
//! conversation simulation endpoints, learner profiles, health and cache
//! administration. Uses axum for routing and schemars for the published
//! request/response schemas.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod profiles;
pub mod routing;
pub mod server;
pub mod state;
pub mod types;

pub use config::{ServerArgs, ServerConfig, StoreKind};
pub use routing::create_router;
pub use server::start_server;
pub use state::AppState;
