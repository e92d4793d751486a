pub mod application;
pub mod commands;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod observability;
