use crate::rendering::common::transform::Transform;
use crate::rendering::common::types::{BakedQuad, ElementType, ElementUsage, Facing, Sprite, VertexFormat};
use glam::Vec3;
use itertools::Itertools;
use modelfoam_intern::containers::Slot;
use std::sync::Arc;

/// Depth of the front face of a generated item, the back face mirrors it.
const FRONT_DEPTH: f32 = 8.5 / 16.0;
const BACK_DEPTH: f32 = 7.5 / 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadCorner {
    /// In block space, `0..=1`.
    pub position: Vec3,
    /// Texel coordinates on the sprite, `0..=16`.
    pub u: f32,
    pub v: f32,
}

impl QuadCorner {
    pub const fn new(x: f32, y: f32, z: f32, u: f32, v: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            u,
            v,
        }
    }
}

/// Everything needed to build one quad, apart from the format and the sprite.
#[derive(Debug, Clone)]
pub struct QuadRequest {
    pub transform: Option<Transform>,
    pub face: Facing,
    pub tint_index: i32,
    pub corners: [QuadCorner; 4],
}

pub fn front_corners() -> [QuadCorner; 4] {
    [
        QuadCorner::new(0.0, 0.0, FRONT_DEPTH, 0.0, 16.0),
        QuadCorner::new(1.0, 0.0, FRONT_DEPTH, 16.0, 16.0),
        QuadCorner::new(1.0, 1.0, FRONT_DEPTH, 16.0, 0.0),
        QuadCorner::new(0.0, 1.0, FRONT_DEPTH, 0.0, 0.0),
    ]
}

pub fn back_corners() -> [QuadCorner; 4] {
    [
        QuadCorner::new(0.0, 0.0, BACK_DEPTH, 0.0, 16.0),
        QuadCorner::new(0.0, 1.0, BACK_DEPTH, 0.0, 0.0),
        QuadCorner::new(1.0, 1.0, BACK_DEPTH, 16.0, 0.0),
        QuadCorner::new(1.0, 0.0, BACK_DEPTH, 16.0, 16.0),
    ]
}

fn pack_vertex(bytes: &mut Vec<u8>, format: &VertexFormat, position: Vec3, normal: Vec3, u: f32, v: f32) {
    for element in format.element_list() {
        match (element.usage, element.kind) {
            (ElementUsage::Position, ElementType::Float) => {
                for component in position.to_array() {
                    bytes.extend_from_slice(&component.to_le_bytes());
                }
            }
            (ElementUsage::Uv, ElementType::Float) => {
                bytes.extend_from_slice(&u.to_le_bytes());
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            (ElementUsage::Color, _) => bytes.extend_from_slice(&[0xFF; 4]),
            (ElementUsage::Normal, ElementType::Byte) => {
                for component in normal.to_array() {
                    bytes.push(((component * 127.0) as i8) as u8);
                }
            }
            // Lightmap coordinates, padding and anything unknown are zeroed.
            _ => bytes.resize(bytes.len() + element.size(), 0),
        }
    }

    // Every vertex starts at a word boundary.
    bytes.resize(bytes.len().next_multiple_of(4), 0);
}

pub fn build_quad(format: &Arc<VertexFormat>, sprite: &Arc<Sprite>, request: &QuadRequest) -> BakedQuad {
    let transform = request.transform.unwrap_or(Transform::IDENTITY);
    let normal = transform.transform_normal(request.face.normal());

    let mut bytes = Vec::with_capacity(format.integer_size() * 4 * 4);
    for corner in &request.corners {
        pack_vertex(
            &mut bytes,
            format,
            transform.transform_point(corner.position),
            normal,
            sprite.interpolated_u(corner.u),
            sprite.interpolated_v(corner.v),
        );
    }

    let vertex_data = bytes
        .chunks_exact(4)
        .map(|word| i32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect_vec();

    BakedQuad {
        vertex_data: Arc::from(vertex_data),
        tint_index: request.tint_index,
        face: request.face,
        sprite: Slot::new(sprite.clone()),
        format: Slot::new(format.clone()),
        shade: false,
    }
}

/// The quads of one flat item layer: a front (south) and a back (north) face.
pub fn quads_for_sprite(
    tint_index: i32,
    sprite: &Arc<Sprite>,
    format: &Arc<VertexFormat>,
    transform: Option<Transform>,
) -> Vec<Arc<BakedQuad>> {
    [(Facing::North, back_corners()), (Facing::South, front_corners())]
        .into_iter()
        .map(|(face, corners)| {
            Arc::new(build_quad(
                format,
                sprite,
                &QuadRequest {
                    transform,
                    face,
                    tint_index,
                    corners,
                },
            ))
        })
        .collect_vec()
}

#[cfg(test)]
mod tests {
    use crate::rendering::baking::quads::{front_corners, quads_for_sprite};
    use crate::rendering::common::resource::ResourceLocation;
    use crate::rendering::common::types::{Facing, Sprite, VertexFormat};
    use std::sync::Arc;

    #[test]
    fn vertex_data_follows_the_format() {
        let sprite = Arc::new(Sprite::new(ResourceLocation::parse("items/apple"), 16, 16, [0.25, 0.5, 0.0, 0.25]));
        let format = Arc::new(VertexFormat::item());
        let quads = quads_for_sprite(0, &sprite, &format, None);

        assert_eq!(quads.len(), 2);
        assert_eq!(quads[1].face, Facing::South);
        // position (3) + color (1) + uv (2) + normal and padding (1), four vertices
        assert_eq!(format.integer_size(), 7);
        assert_eq!(quads[1].vertex_data.len(), 4 * 7);

        let first = &quads[1].vertex_data;
        assert_eq!(f32::from_bits(first[2] as u32), front_corners()[0].position.z);
        // u of the first corner is the minimum u of the sprite, v the maximum
        assert_eq!(f32::from_bits(first[4] as u32), 0.25);
        assert_eq!(f32::from_bits(first[5] as u32), 0.25);
    }
}
