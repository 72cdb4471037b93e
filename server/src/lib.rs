pub mod config;
pub mod domain;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
