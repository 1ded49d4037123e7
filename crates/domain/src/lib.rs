//! `ctms-domain`: types shared by every crate in the workspace: the
//! error enum, the TOML configuration model, and structured trace events.

pub mod config;
pub mod error;
pub mod trace;
