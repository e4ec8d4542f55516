//! Property-based tests for extraction invariants

mod extraction_indices;
