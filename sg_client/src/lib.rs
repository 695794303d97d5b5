//! Command parsing and text rendering for the sg_client binary.

pub mod commands;
pub mod render;
