pub mod auth;
pub mod chirps;
pub mod config;
pub mod error;
pub mod extract;
pub mod jwt;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod users;
pub mod webhooks;
