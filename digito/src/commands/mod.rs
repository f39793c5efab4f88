//! Subcommand implementations.

pub mod alarms;
pub mod helpers;
pub mod publish;
pub mod validate;
