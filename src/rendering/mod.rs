pub mod baking;
pub mod common;
pub mod dedup;
pub mod model;
