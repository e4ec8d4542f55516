//! Integration tests for the Minewatch extraction and analysis pipeline

mod config_integration;
mod extraction_pipeline;
mod frame_removal;
mod progress_observability;
mod test_utils;
