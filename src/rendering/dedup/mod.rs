//! Hooks the render model up to the deduplication engine.
pub mod cache_wipe;
pub mod capabilities;
pub mod diagnostics;
pub mod orchestrator;
pub mod registries;
pub mod rules;
