//! Core types, configuration and the translator facade

pub(crate) mod blocking;
pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod models;
pub mod options;
pub mod policy;
pub mod pricing;
