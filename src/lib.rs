//! Merges structurally equal parts of loaded and baked render models, so that thousands of block
//! and item models share one copy of each quad, transform and texture name.
pub mod demo;
pub mod rendering;
pub mod settings;
pub mod util;
