/// `namespace:path` keys that everything in the asset registries is looked up by.
pub mod resource;
/// Item perspectives and their transformation matrices.
pub mod transform;
/// Basic render types (vertex formats, quads, sprites) shared by descriptors and baked models.
pub mod types;
