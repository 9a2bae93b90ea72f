//! Sotto Core - domain types shared by the daemon and its clients.
//!
//! This crate contains the command grammar, the settings field catalogue,
//! and the device state model. It performs no I/O.

pub mod command;
pub mod error;
pub mod field;
pub mod state;

pub use command::Command;
pub use error::{Error, Result};
pub use field::{ConfigField, MixerMode};
pub use state::{DeviceState, parse_error_line};
