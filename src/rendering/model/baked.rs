use crate::rendering::baking::quads::quads_for_sprite;
use crate::rendering::common::transform::{Transform, TransformMap, TransformType, perspective};
use crate::rendering::common::types::{BakedQuad, Facing, ItemOverrides, Sprite, VertexFormat};
use glam::Mat4;
use itertools::Itertools;
use modelfoam_intern::Handle;
use modelfoam_intern::containers::{NodeList, NodeMap, Slot};
use modelfoam_intern::lazy::{KeyedLazyCache, LazySlot};
use std::sync::{Arc, Weak};

pub type QuadList = NodeList<BakedQuad>;
pub type Quads = Arc<Vec<Arc<BakedQuad>>>;

fn no_quads() -> Quads {
    Arc::new(Vec::new())
}

#[derive(Debug)]
pub struct SimpleBakedModel {
    pub general_quads: Slot<QuadList>,
    pub face_quads: Slot<NodeMap<Facing, QuadList>>,
    pub ambient_occlusion: bool,
    pub gui_3d: bool,
    pub particle: Slot<Sprite>,
    pub transforms: Slot<TransformMap>,
    pub overrides: Slot<ItemOverrides>,
}

impl SimpleBakedModel {
    /// Quads facing `side`, or the ones that are never culled for `None`.
    pub fn quads(&self, side: Option<Facing>) -> Quads {
        let quads = match side {
            None => Some(self.general_quads.load()),
            Some(side) => self.face_quads.load().get(&side),
        };
        quads
            .map(|list| Arc::new(list.to_vec()))
            .unwrap_or_else(no_quads)
    }
}

/// One conditional part of a multipart model, e.g. the fence post or one of its arms.
#[derive(Debug)]
pub struct MultipartPart {
    /// Comma separated `property=value` pairs that all have to be present in the block state.
    pub condition: Slot<String>,
    pub model: Slot<SimpleBakedModel>,
}

impl MultipartPart {
    pub fn applies(&self, state: &str) -> bool {
        let condition = self.condition.load();
        condition
            .split(',')
            .filter(|pair| !pair.is_empty())
            .all(|pair| state.split(',').any(|entry| entry == pair))
    }
}

fn multipart_quads(parts: &[Arc<MultipartPart>], state: &str, side: Option<Facing>) -> Vec<Arc<BakedQuad>> {
    parts
        .iter()
        .filter(|part| part.applies(state))
        .flat_map(|part| part.model.load().quads(side).to_vec())
        .collect_vec()
}

const CACHED_STATES: usize = 64;

pub type StateKey = (String, Option<Facing>);

/// A multipart model as the model loader produces it. It memoizes the quads of every block state
/// it has been asked for, which makes it both large and identity sensitive. The memo is reclaimable,
/// see [`MultipartBakedModel::state_cache`].
pub struct MultipartBakedModel {
    pub parts: Vec<Arc<MultipartPart>>,
    state_cache: Arc<KeyedLazyCache<StateKey, Vec<Arc<BakedQuad>>>>,
}

impl MultipartBakedModel {
    pub fn new(parts: Vec<Arc<MultipartPart>>) -> Self {
        Self {
            parts,
            state_cache: Arc::new(KeyedLazyCache::with_capacity(CACHED_STATES)),
        }
    }

    pub fn quads(&self, state: &str, side: Option<Facing>) -> Quads {
        self.state_cache
            .get(&(state.to_string(), side), |(state, side)| {
                multipart_quads(&self.parts, state, *side)
            })
    }

    /// For registering with a [`crate::util::weak_dashmap::SlotTracker`].
    pub fn state_cache(&self) -> &Arc<KeyedLazyCache<StateKey, Vec<Arc<BakedQuad>>>> {
        &self.state_cache
    }

    pub fn cached_states(&self) -> usize {
        self.state_cache.len()
    }
}

/// The replacement for [`MultipartBakedModel`]: same parts, but quads are collected per call.
#[derive(Debug)]
pub struct CompactMultipartModel {
    pub parts: Slot<NodeList<MultipartPart>>,
    pub ambient_occlusion: bool,
    pub gui_3d: bool,
    pub particle: Option<Arc<Sprite>>,
}

impl From<&MultipartBakedModel> for CompactMultipartModel {
    fn from(value: &MultipartBakedModel) -> Self {
        let first = value.parts.first().map(|part| part.model.load());
        Self {
            parts: Slot::from_value(NodeList::new(value.parts.clone())),
            ambient_occlusion: first.as_ref().is_none_or(|model| model.ambient_occlusion),
            gui_3d: first.as_ref().is_some_and(|model| model.gui_3d),
            particle: first.map(|model| model.particle.load()),
        }
    }
}

impl CompactMultipartModel {
    pub fn quads(&self, state: &str, side: Option<Facing>) -> Quads {
        Arc::new(multipart_quads(&self.parts.load().to_vec(), state, side))
    }
}

type LazyQuads = LazySlot<Vec<Arc<BakedQuad>>>;

fn bake_layers(textures: &QuadSource) -> Vec<Arc<BakedQuad>> {
    textures
        .sprites
        .load()
        .to_vec()
        .iter()
        .enumerate()
        .flat_map(|(index, sprite)| quads_for_sprite(index as i32, sprite, &textures.format.load(), textures.transform))
        .collect_vec()
}

/// What the layer quads of a generated item are computed from.
#[derive(Debug)]
pub struct QuadSource {
    pub sprites: Slot<NodeList<Sprite>>,
    pub format: Slot<VertexFormat>,
    pub transform: Option<Transform>,
}

/// A generated item that is always rendered in 3D. Its quads are only kept as long as memory
/// allows and are recomputed from the layer sprites otherwise.
#[derive(Debug)]
pub struct StaticItemModel {
    pub transforms: Slot<TransformMap>,
    pub particle: Slot<Sprite>,
    pub overrides: Slot<ItemOverrides>,
    pub source: Slot<QuadSource>,
    quads: Arc<LazyQuads>,
}

impl StaticItemModel {
    pub fn new(transforms: Arc<TransformMap>, particle: Arc<Sprite>, overrides: Arc<ItemOverrides>, source: QuadSource) -> Self {
        Self {
            transforms: Slot::new(transforms),
            particle: Slot::new(particle),
            overrides: Slot::new(overrides),
            source: Slot::from_value(source),
            quads: Arc::new(LazySlot::new()),
        }
    }

    pub fn quads(&self, side: Option<Facing>) -> Quads {
        match side {
            None => self
                .quads
                .get_or_compute(|| bake_layers(&self.source.load())),
            Some(_) => no_quads(),
        }
    }

    pub fn lazy_quads(&self) -> &Arc<LazyQuads> {
        &self.quads
    }

    pub fn handle_perspective(&self, kind: TransformType) -> Option<Mat4> {
        perspective(&self.transforms.load(), kind)
    }
}

/// The flat variant of a generated item, used in the GUI. Its quads are eagerly baked front faces.
#[derive(Debug)]
pub struct DynamicItemModel {
    pub fast_quads: Slot<QuadList>,
    pub particle: Slot<Sprite>,
    pub transforms: Slot<TransformMap>,
    pub overrides: Slot<ItemOverrides>,
    pub source: Slot<QuadSource>,
    other: Weak<Dynamic3DItemModel>,
}

impl DynamicItemModel {
    pub fn quads(&self, side: Option<Facing>) -> Quads {
        match side {
            None => Arc::new(self.fast_quads.load().to_vec()),
            Some(_) => no_quads(),
        }
    }

    /// Everything but the GUI is rendered with the 3D variant.
    pub fn handle_perspective(self: &Arc<Self>, kind: TransformType) -> (BakedModel, Option<Mat4>) {
        let matrix = perspective(&self.transforms.load(), kind);
        match (kind, self.other.upgrade()) {
            (TransformType::Gui, _) | (_, None) => (BakedModel::DynamicItem(self.clone()), matrix),
            (_, Some(other)) => (BakedModel::DynamicItem3D(other), matrix),
        }
    }
}

/// The 3D variant of a generated item. This is the model that ends up in the model registry, the
/// flat one is only reached through [`Dynamic3DItemModel::handle_perspective`].
#[derive(Debug)]
pub struct Dynamic3DItemModel {
    pub parent: Arc<DynamicItemModel>,
    quads: Arc<LazyQuads>,
}

pub struct DynamicItemParts {
    pub fast_quads: Vec<Arc<BakedQuad>>,
    pub particle: Arc<Sprite>,
    pub transforms: Arc<TransformMap>,
    pub overrides: Arc<ItemOverrides>,
    pub source: QuadSource,
}

impl Dynamic3DItemModel {
    pub fn new(parts: DynamicItemParts) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            parent: Arc::new(DynamicItemModel {
                fast_quads: Slot::from_value(NodeList::new(parts.fast_quads)),
                particle: Slot::new(parts.particle),
                transforms: Slot::new(parts.transforms),
                overrides: Slot::new(parts.overrides),
                source: Slot::from_value(parts.source),
                other: weak.clone(),
            }),
            quads: Arc::new(LazySlot::new()),
        })
    }

    pub fn quads(&self, side: Option<Facing>) -> Quads {
        match side {
            None => self
                .quads
                .get_or_compute(|| bake_layers(&self.parent.source.load())),
            Some(_) => no_quads(),
        }
    }

    pub fn lazy_quads(&self) -> &Arc<LazyQuads> {
        &self.quads
    }

    /// In the GUI, an untransformed item is rendered flat.
    pub fn handle_perspective(self: &Arc<Self>, kind: TransformType) -> (BakedModel, Option<Mat4>) {
        let matrix = perspective(&self.parent.transforms.load(), kind);
        if kind == TransformType::Gui && matrix.is_none() {
            return (BakedModel::DynamicItem(self.parent.clone()), None);
        }

        (BakedModel::DynamicItem3D(self.clone()), matrix)
    }
}

#[derive(Clone)]
pub enum BakedModel {
    Simple(Arc<SimpleBakedModel>),
    Multipart(Arc<MultipartBakedModel>),
    CompactMultipart(Arc<CompactMultipartModel>),
    StaticItem(Arc<StaticItemModel>),
    DynamicItem(Arc<DynamicItemModel>),
    DynamicItem3D(Arc<Dynamic3DItemModel>),
}

impl BakedModel {
    pub fn handle(&self) -> Handle {
        match self {
            BakedModel::Simple(model) => model.clone() as Handle,
            BakedModel::Multipart(model) => model.clone() as Handle,
            BakedModel::CompactMultipart(model) => model.clone() as Handle,
            BakedModel::StaticItem(model) => model.clone() as Handle,
            BakedModel::DynamicItem(model) => model.clone() as Handle,
            BakedModel::DynamicItem3D(model) => model.clone() as Handle,
        }
    }

    /// The inverse of [`BakedModel::handle`], `None` for anything that is not a baked model.
    pub fn from_handle(handle: Handle) -> Option<Self> {
        let handle = match handle.downcast::<SimpleBakedModel>() {
            Ok(model) => return Some(BakedModel::Simple(model)),
            Err(handle) => handle,
        };
        let handle = match handle.downcast::<MultipartBakedModel>() {
            Ok(model) => return Some(BakedModel::Multipart(model)),
            Err(handle) => handle,
        };
        let handle = match handle.downcast::<CompactMultipartModel>() {
            Ok(model) => return Some(BakedModel::CompactMultipart(model)),
            Err(handle) => handle,
        };
        let handle = match handle.downcast::<StaticItemModel>() {
            Ok(model) => return Some(BakedModel::StaticItem(model)),
            Err(handle) => handle,
        };
        let handle = match handle.downcast::<DynamicItemModel>() {
            Ok(model) => return Some(BakedModel::DynamicItem(model)),
            Err(handle) => handle,
        };
        handle
            .downcast::<Dynamic3DItemModel>()
            .ok()
            .map(BakedModel::DynamicItem3D)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BakedModel::Simple(_) => "simple",
            BakedModel::Multipart(_) => "multipart",
            BakedModel::CompactMultipart(_) => "compact multipart",
            BakedModel::StaticItem(_) => "static item",
            BakedModel::DynamicItem(_) => "dynamic item",
            BakedModel::DynamicItem3D(_) => "dynamic 3d item",
        }
    }

    /// The quads to render for `state` (ignored by everything but multipart models).
    pub fn quads(&self, state: &str, side: Option<Facing>) -> Quads {
        match self {
            BakedModel::Simple(model) => model.quads(side),
            BakedModel::Multipart(model) => model.quads(state, side),
            BakedModel::CompactMultipart(model) => model.quads(state, side),
            BakedModel::StaticItem(model) => model.quads(side),
            BakedModel::DynamicItem(model) => model.quads(side),
            BakedModel::DynamicItem3D(model) => model.quads(side),
        }
    }

    pub fn same_instance(&self, other: &BakedModel) -> bool {
        Arc::ptr_eq(&self.handle(), &other.handle())
    }
}

impl std::fmt::Debug for BakedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BakedModel::{}({:p})", self.kind(), Arc::as_ptr(&self.handle()))
    }
}
