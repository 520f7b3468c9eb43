//! HTTP API handlers for the validator service

pub mod alerts;
pub mod candidates;
pub mod health;
pub mod validation;

pub use alerts::alert_routes;
pub use candidates::candidate_routes;
pub use health::health_routes;
pub use validation::validation_routes;
