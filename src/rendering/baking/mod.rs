/// Sprite lookup by texture location.
pub mod atlas;
/// Baking of generated (flat, layered) item models.
pub mod item_layer;
/// Vertex packing for single quads.
pub mod quads;
