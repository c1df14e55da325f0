//! The parts of the host's global state the deduplication pass reads and writes.
//!
//! Every collaborator is a trait, so tests (and other hosts) can hand in whatever they have. The
//! implementations below are ordered maps, which makes the traversal order, and with it the choice
//! of canonical instances, the same on every run.
use crate::rendering::common::resource::{ModelResourceLocation, ResourceLocation};
use crate::rendering::common::types::{Stat, StatFormatter, VertexFormat};
use crate::rendering::model::baked::BakedModel;
use crate::rendering::model::descriptor::Descriptor;
use modelfoam_intern::containers::NodeList;
use std::collections::BTreeMap;
use std::sync::Arc;

pub trait ResourceRegistry {
    fn block_keys(&self) -> Vec<Arc<ResourceLocation>>;

    fn item_keys(&self) -> Vec<Arc<ResourceLocation>>;
}

/// The unbaked models, keyed by the location they were loaded from.
pub trait DescriptorCache {
    fn keys(&self) -> Vec<ResourceLocation>;

    fn get(&self, key: &ResourceLocation) -> Option<Descriptor>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keeps the entries for which `keep` returns true.
    fn retain(&mut self, keep: &mut dyn FnMut(&ResourceLocation) -> bool);
}

pub trait BakedModelTable {
    fn keys(&self) -> Vec<ModelResourceLocation>;

    fn get(&self, key: &ModelResourceLocation) -> Option<BakedModel>;

    fn put(&mut self, key: ModelResourceLocation, model: BakedModel);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Long lived singletons that are not reachable from any registry.
pub trait StaticRoots {
    fn vertex_formats(&self) -> Vec<Arc<VertexFormat>>;

    fn stat_arrays(&self) -> Vec<Arc<NodeList<Stat>>>;

    fn all_stats(&self) -> Vec<Arc<Stat>>;
}

#[derive(Debug, Default)]
pub struct GameRegistry {
    blocks: BTreeMap<ResourceLocation, Arc<ResourceLocation>>,
    items: BTreeMap<ResourceLocation, Arc<ResourceLocation>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the key instance the registry hands out for `location`.
    pub fn register_block(&mut self, location: ResourceLocation) -> Arc<ResourceLocation> {
        self.blocks
            .entry(location.clone())
            .or_insert_with(|| Arc::new(location))
            .clone()
    }

    pub fn register_item(&mut self, location: ResourceLocation) -> Arc<ResourceLocation> {
        self.items
            .entry(location.clone())
            .or_insert_with(|| Arc::new(location))
            .clone()
    }
}

impl ResourceRegistry for GameRegistry {
    fn block_keys(&self) -> Vec<Arc<ResourceLocation>> {
        self.blocks.values().cloned().collect()
    }

    fn item_keys(&self) -> Vec<Arc<ResourceLocation>> {
        self.items.values().cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct ModelCache {
    descriptors: BTreeMap<ResourceLocation, Descriptor>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ResourceLocation, descriptor: Descriptor) {
        self.descriptors.insert(key, descriptor);
    }
}

impl DescriptorCache for ModelCache {
    fn keys(&self) -> Vec<ResourceLocation> {
        self.descriptors.keys().cloned().collect()
    }

    fn get(&self, key: &ResourceLocation) -> Option<Descriptor> {
        self.descriptors.get(key).cloned()
    }

    fn len(&self) -> usize {
        self.descriptors.len()
    }

    fn retain(&mut self, keep: &mut dyn FnMut(&ResourceLocation) -> bool) {
        self.descriptors.retain(|key, _| keep(key));
    }
}

#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<ModelResourceLocation, BakedModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModelResourceLocation, &BakedModel)> {
        self.models.iter()
    }
}

impl BakedModelTable for ModelRegistry {
    fn keys(&self) -> Vec<ModelResourceLocation> {
        self.models.keys().cloned().collect()
    }

    fn get(&self, key: &ModelResourceLocation) -> Option<BakedModel> {
        self.models.get(key).cloned()
    }

    fn put(&mut self, key: ModelResourceLocation, model: BakedModel) {
        self.models.insert(key, model);
    }

    fn len(&self) -> usize {
        self.models.len()
    }
}

#[derive(Debug, Default)]
pub struct HostStatics {
    pub vertex_formats: Vec<Arc<VertexFormat>>,
    pub stat_arrays: Vec<Arc<NodeList<Stat>>>,
    pub stats: Vec<Arc<Stat>>,
}

impl HostStatics {
    /// The built-in vertex formats and general statistics.
    pub fn standard() -> Self {
        let general = [
            ("stat.leaveGame", "Games quit", StatFormatter::Simple),
            ("stat.playOneMinute", "Minutes Played", StatFormatter::Time),
            ("stat.timeSinceDeath", "Since Last Death", StatFormatter::Time),
            ("stat.walkOneCm", "Distance Walked", StatFormatter::Distance),
            ("stat.sprintOneCm", "Distance Sprinted", StatFormatter::Distance),
            ("stat.damageDealt", "Damage Dealt", StatFormatter::Divide),
            ("stat.damageTaken", "Damage Taken", StatFormatter::Divide),
        ]
        .map(|(id, name, formatter)| Arc::new(Stat::new(id, name, formatter)));

        Self {
            vertex_formats: vec![
                Arc::new(VertexFormat::block()),
                Arc::new(VertexFormat::item()),
                Arc::new(VertexFormat::position_tex()),
                Arc::new(VertexFormat::position_tex_color_normal()),
            ],
            stat_arrays: vec![Arc::new(NodeList::new(general.to_vec()))],
            stats: general.to_vec(),
        }
    }

    /// Adds one statistic per block, all of them sharing a display name pattern and formatter.
    pub fn add_block_stats(&mut self, prefix: &str, display: &str, blocks: &[Arc<ResourceLocation>]) {
        let stats = blocks
            .iter()
            .map(|block| {
                Arc::new(Stat::new(
                    format!("{}.{}", prefix, block.path.replace('/', ".")),
                    display,
                    StatFormatter::Simple,
                ))
            })
            .collect::<Vec<_>>();

        self.stats.extend(stats.iter().cloned());
        self.stat_arrays.push(Arc::new(NodeList::new(stats)));
    }
}

impl StaticRoots for HostStatics {
    fn vertex_formats(&self) -> Vec<Arc<VertexFormat>> {
        self.vertex_formats.clone()
    }

    fn stat_arrays(&self) -> Vec<Arc<NodeList<Stat>>> {
        self.stat_arrays.clone()
    }

    fn all_stats(&self) -> Vec<Arc<Stat>> {
        self.stats.clone()
    }
}
