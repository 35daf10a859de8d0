//! Configuration parsing for hidremap
//!
//! This crate parses KDL configuration files into immutable [`Config`] /
//! [`Profile`] objects consumed by the daemon. The daemon never mutates a
//! profile in place; a reload produces a fresh `Config` that replaces the
//! old one wholesale.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{parse_config, parse_config_str};
