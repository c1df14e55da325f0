/// Render-ready models, produced from descriptors by the bakers.
pub mod baked;
/// Unbaked model descriptions as they come from the model files.
pub mod descriptor;
