pub mod config;
pub mod entities;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
