//! `ctms-cli`: the `ctms` command-line client.

pub mod cli;
