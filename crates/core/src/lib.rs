//! Core business logic for FixMyCity.

pub mod services;

pub use services::*;
