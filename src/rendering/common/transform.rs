use glam::{Mat4, Quat, Vec3};
use modelfoam_intern::Value;
use modelfoam_intern::containers::{MapKey, NodeMap};
use std::collections::HashMap;
use std::sync::Arc;

/// The perspectives an item model can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransformType {
    None,
    ThirdPersonLeftHand,
    ThirdPersonRightHand,
    FirstPersonLeftHand,
    FirstPersonRightHand,
    Head,
    Gui,
    Ground,
    Fixed,
}

impl MapKey for TransformType {
    fn to_value(&self) -> Value {
        Value::from(*self as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub matrix: Mat4,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { matrix: Mat4::IDENTITY };

    pub fn from_trs(translation: Vec3, rotation_degrees: Vec3, scale: Vec3) -> Self {
        let rotation = Quat::from_euler(
            glam::EulerRot::XYZ,
            rotation_degrees.x.to_radians(),
            rotation_degrees.y.to_radians(),
            rotation_degrees.z.to_radians(),
        );
        Self {
            matrix: Mat4::from_scale_rotation_translation(scale, rotation, translation),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.matrix.abs_diff_eq(Mat4::IDENTITY, 1.0e-6)
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix.transform_point3(point)
    }

    pub fn transform_normal(&self, normal: Vec3) -> Vec3 {
        self.matrix.transform_vector3(normal).normalize_or_zero()
    }
}

pub type TransformMap = NodeMap<TransformType, Transform>;

pub fn transform_map(entries: impl IntoIterator<Item = (TransformType, Transform)>) -> TransformMap {
    NodeMap::new(
        entries
            .into_iter()
            .map(|(kind, transform)| (kind, Arc::new(transform)))
            .collect::<HashMap<_, _>>(),
    )
}

/// The matrix to render `kind` with, `None` when the map does not define it.
pub fn perspective(transforms: &TransformMap, kind: TransformType) -> Option<Mat4> {
    transforms
        .get(&kind)
        .filter(|transform| !transform.is_identity())
        .map(|transform| transform.matrix)
}
