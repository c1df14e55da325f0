use crate::rendering::common::resource::ResourceLocation;
use crate::rendering::common::transform::TransformMap;
use crate::rendering::common::types::{Facing, ItemOverrides};
use glam::Vec3;
use modelfoam_intern::Handle;
use modelfoam_intern::containers::{NodeList, NodeMap, OptionalSlot, Slot};
use std::sync::Arc;

#[derive(Debug)]
pub struct ElementFace {
    /// Either a texture variable (`#side`) or a location.
    pub texture: Slot<String>,
    pub uv: [f32; 4],
    pub cull_face: Option<Facing>,
    pub tint_index: i32,
    pub rotation: u32,
}

impl ElementFace {
    pub fn new(texture: &str, cull_face: Option<Facing>) -> Self {
        Self {
            texture: Slot::from_value(texture.to_string()),
            uv: [0.0, 0.0, 16.0, 16.0],
            cull_face,
            tint_index: -1,
            rotation: 0,
        }
    }
}

#[derive(Debug)]
pub struct ModelElement {
    pub from: Vec3,
    pub to: Vec3,
    pub faces: Slot<NodeMap<Facing, ElementFace>>,
    pub shade: bool,
}

impl ModelElement {
    /// A full block with every face using `texture`, culled against its neighbour.
    pub fn cube(texture: &str) -> Self {
        Self {
            from: Vec3::ZERO,
            to: Vec3::splat(16.0),
            faces: Slot::from_value(NodeMap::from_values(
                Facing::ALL.map(|facing| (facing, ElementFace::new(texture, Some(facing)))),
            )),
            shade: true,
        }
    }
}

/// The unbaked block model as it is read from the model files.
#[derive(Debug, Default)]
pub struct ModelDescriptor {
    pub parent_location: OptionalSlot<ResourceLocation>,
    /// Resolved from `parent_location` while loading. Broken model files may point at themselves.
    pub parent: OptionalSlot<ModelDescriptor>,
    pub elements: Slot<NodeList<ModelElement>>,
    pub textures: Slot<NodeMap<String, ResourceLocation>>,
    pub transforms: Slot<TransformMap>,
    pub ambient_occlusion: bool,
    pub gui_3d: bool,
}

impl ModelDescriptor {
    pub fn with_parent(parent: &Arc<ModelDescriptor>, parent_location: ResourceLocation) -> Self {
        Self {
            parent_location: OptionalSlot::new(Some(Arc::new(parent_location))),
            parent: OptionalSlot::new(Some(parent.clone())),
            ..Default::default()
        }
    }

    /// Looks up a texture variable, following `#references` and the parent chain.
    pub fn resolve_texture(&self, variable: &str) -> Option<Arc<ResourceLocation>> {
        const MAX_INDIRECTIONS: usize = 8;

        let mut variable = variable.trim_start_matches('#').to_string();
        for _ in 0..MAX_INDIRECTIONS {
            let location = self.lookup_texture(&variable, MAX_INDIRECTIONS)?;
            match location.path.strip_prefix('#') {
                Some(reference) => variable = reference.to_string(),
                None => return Some(location),
            }
        }

        None
    }

    fn lookup_texture(&self, variable: &str, depth: usize) -> Option<Arc<ResourceLocation>> {
        if let Some(location) = self.textures.load().get(&variable.to_string()) {
            return Some(location);
        }

        let parent = self.parent.load()?;
        if depth == 0 || std::ptr::eq(parent.as_ref(), self) {
            return None;
        }

        parent.lookup_texture(variable, depth - 1)
    }
}

/// The unbaked description of a generated item model: one flat layer per texture.
#[derive(Debug)]
pub struct ItemLayerDescriptor {
    pub textures: Slot<NodeList<ResourceLocation>>,
    pub transforms: Slot<TransformMap>,
    // Only reachable through the registered capabilities.
    pub(crate) overrides: Slot<ItemOverrides>,
}

impl ItemLayerDescriptor {
    pub fn new(textures: Vec<ResourceLocation>, transforms: TransformMap, overrides: ItemOverrides) -> Self {
        Self {
            textures: Slot::from_value(NodeList::from_values(textures)),
            transforms: Slot::from_value(transforms),
            overrides: Slot::from_value(overrides),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Descriptor {
    Block(Arc<ModelDescriptor>),
    ItemLayer(Arc<ItemLayerDescriptor>),
}

impl Descriptor {
    pub fn handle(&self) -> Handle {
        match self {
            Descriptor::Block(descriptor) => descriptor.clone() as Handle,
            Descriptor::ItemLayer(descriptor) => descriptor.clone() as Handle,
        }
    }
}
