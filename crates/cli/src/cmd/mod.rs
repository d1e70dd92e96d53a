//! CLI command implementations

pub mod enable;
pub mod run;
pub mod status;
