//! Integration test modules for audiodev

pub mod callback;
pub mod config;
pub mod devices;
pub mod lifecycle;
