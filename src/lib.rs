//! Minewatch: Mine-Site Video Analysis
//!
//! Samples frames from mine-site video at a fixed stride, filters them for
//! relevance with a vision model, records per-category observations for each
//! relevant frame and summarizes everything into a narrative conclusion.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod frame;
pub mod logging;
pub mod progress;
pub mod provider;
pub mod session;
pub mod video;
