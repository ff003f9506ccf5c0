//! Plex media server backend.

mod client;
mod types;

pub use client::PlexClient;
