pub mod api;
pub mod app;
pub mod capture;
pub mod cli;
pub mod companion;
pub mod config;
pub mod global;
pub mod library;
pub mod openai;
pub mod session;
pub mod store;
