//! Core types for the Matomo tracker wrapper: tracker configuration, the
//! error taxonomy, and the `_paq` command vocabulary.

pub mod config;
pub mod error;
pub mod types;

pub use crate::config::{TrackerConfig, TrackerOptions};
pub use error::{TrackerError, TrackerResult};
pub use types::{Command, CommandName, CustomDimension};
