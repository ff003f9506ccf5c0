//! posterforge - rating overlays for Plex movie posters
//!
//! This library crate exposes the pipeline for the binary and for
//! integration testing.

pub mod http;
pub mod logging;
pub mod media;
pub mod orchestrator;
pub mod plex;
pub mod processor;
pub mod ratings;
pub mod registry;
