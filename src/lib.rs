//! Proton-GE Manager Library
//!
//! Release discovery, asset selection and streaming `.tar.gz` installation
//! used by the `protonge` CLI. Every core call is stateless: inputs come in as
//! parameters and results go back as values.

pub mod commands;
pub mod core;
pub mod error;
pub mod utils;
