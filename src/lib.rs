//! ReelFlow - video production pipeline tracker
//!
//! Channels own content items; each item moves through seven production
//! stages (channel ready, script, thumbnails, narration, final render,
//! published, analytics) and keeps one artifact per done stage.

pub mod config;
pub mod error;
pub mod models;
pub mod persist;
pub mod pipeline;
pub mod routes;
pub mod state;
