pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod schema;

#[cfg(test)]
pub mod testing;
