//! A synthetic asset set with the kind of redundancy real model loading produces: every block
//! model carries its own copies of quads, transforms, texture names and parent locations.
use crate::rendering::baking::atlas::TextureAtlas;
use crate::rendering::baking::item_layer::ItemLayerBaker;
use crate::rendering::baking::quads::{QuadRequest, build_quad, front_corners};
use crate::rendering::common::resource::{ModelResourceLocation, ResourceLocation};
use crate::rendering::common::transform::{Transform, TransformMap, TransformType, transform_map};
use crate::rendering::common::types::{Facing, ItemOverride, ItemOverrides, Sprite, VertexFormat};
use crate::rendering::dedup::registries::{BakedModelTable, GameRegistry, HostStatics, ModelCache, ModelRegistry};
use crate::rendering::model::baked::{BakedModel, MultipartBakedModel, MultipartPart, SimpleBakedModel};
use crate::rendering::model::descriptor::{Descriptor, ItemLayerDescriptor, ModelDescriptor};
use crate::util::weak_dashmap::SlotTracker;
use anyhow::Context;
use glam::Vec3;
use log::info;
use modelfoam_intern::capability::Capabilities;
use modelfoam_intern::containers::{NodeList, NodeMap, Slot};
use std::sync::Arc;

pub const MATERIALS: [&str; 8] = ["stone", "dirt", "planks", "cobblestone", "sand", "gravel", "log", "glass"];
const NAMESPACES: [&str; 3] = ["minecraft", "demo", "othermod"];

pub struct DemoAssets {
    pub resources: GameRegistry,
    pub descriptors: ModelCache,
    pub statics: HostStatics,
    pub baked: ModelRegistry,
    pub atlas: TextureAtlas,
}

pub fn block_transforms() -> TransformMap {
    transform_map([
        (
            TransformType::Gui,
            Transform::from_trs(Vec3::ZERO, Vec3::new(30.0, 225.0, 0.0), Vec3::splat(0.625)),
        ),
        (
            TransformType::Ground,
            Transform::from_trs(Vec3::new(0.0, 3.0 / 16.0, 0.0), Vec3::ZERO, Vec3::splat(0.25)),
        ),
        (
            TransformType::Fixed,
            Transform::from_trs(Vec3::ZERO, Vec3::ZERO, Vec3::splat(0.5)),
        ),
        (
            TransformType::ThirdPersonRightHand,
            Transform::from_trs(Vec3::new(0.0, 2.5 / 16.0, 0.0), Vec3::new(75.0, 45.0, 0.0), Vec3::splat(0.375)),
        ),
    ])
}

/// Transforms of a generated item. Without a GUI transform the item is drawn flat in inventories.
pub fn item_transforms(gui_3d: bool) -> TransformMap {
    let mut entries = vec![
        (
            TransformType::Ground,
            Transform::from_trs(Vec3::new(0.0, 2.0 / 16.0, 0.0), Vec3::ZERO, Vec3::splat(0.5)),
        ),
        (
            TransformType::Head,
            Transform::from_trs(Vec3::new(0.0, 13.0 / 16.0, 7.0 / 16.0), Vec3::new(0.0, 180.0, 0.0), Vec3::ONE),
        ),
    ];
    if gui_3d {
        entries.push((
            TransformType::Gui,
            Transform::from_trs(Vec3::ZERO, Vec3::new(0.0, 180.0, 0.0), Vec3::ONE),
        ));
    }
    transform_map(entries)
}

/// A full block with one quad per side, every piece of it freshly allocated.
pub fn simple_block_model(sprite: &Arc<Sprite>, format: &Arc<VertexFormat>) -> SimpleBakedModel {
    let face_quads = Facing::ALL.map(|face| {
        let quad = build_quad(
            format,
            sprite,
            &QuadRequest {
                transform: None,
                face,
                tint_index: -1,
                corners: front_corners(),
            },
        );
        (face, NodeList::from_values([quad]))
    });

    SimpleBakedModel {
        general_quads: Slot::from_value(NodeList::default()),
        face_quads: Slot::from_value(NodeMap::from_values(face_quads)),
        ambient_occlusion: true,
        gui_3d: true,
        particle: Slot::new(sprite.clone()),
        transforms: Slot::from_value(block_transforms()),
        overrides: Slot::from_value(ItemOverrides::empty()),
    }
}

/// A fence-like model: a post that is always there and an arm that depends on the block state.
pub fn fence_model(sprite: &Arc<Sprite>, format: &Arc<VertexFormat>) -> MultipartBakedModel {
    let part = |condition: &str| {
        Arc::new(MultipartPart {
            condition: Slot::from_value(condition.to_string()),
            model: Slot::from_value(simple_block_model(sprite, format)),
        })
    };

    MultipartBakedModel::new(vec![part(""), part("north=true")])
}

fn block_descriptor(cube_all: &Arc<ModelDescriptor>, texture: ResourceLocation) -> ModelDescriptor {
    let descriptor = ModelDescriptor::with_parent(cube_all, ResourceLocation::parse("block/cube_all"));
    descriptor
        .textures
        .store(Arc::new(NodeMap::from_values([("all".to_string(), texture)])));
    descriptor
}

impl DemoAssets {
    pub fn generate(blocks: usize, capabilities: &Capabilities, tracker: &SlotTracker) -> anyhow::Result<Self> {
        let mut resources = GameRegistry::new();
        let mut descriptors = ModelCache::new();
        let mut statics = HostStatics::standard();
        let mut baked = ModelRegistry::new();
        let mut atlas = TextureAtlas::new();

        let baker = ItemLayerBaker::new(capabilities).context("Creating the item baker")?;
        let block_format = statics
            .vertex_formats
            .first()
            .cloned()
            .context("No block vertex format")?;
        let item_format = Arc::new(VertexFormat::item());

        let builtin = Arc::new(ModelDescriptor::default());
        descriptors.insert(ResourceLocation::parse("builtin/generated"), Descriptor::Block(builtin.clone()));
        descriptors.insert(
            ResourceLocation::parse("item/generated"),
            Descriptor::Block(Arc::new(ModelDescriptor::with_parent(
                &builtin,
                ResourceLocation::parse("builtin/generated"),
            ))),
        );

        let cube_all = Arc::new(ModelDescriptor::default());
        descriptors.insert(ResourceLocation::parse("block/cube_all"), Descriptor::Block(cube_all.clone()));

        let mut block_keys = Vec::with_capacity(blocks);
        let mut item_keys = Vec::with_capacity(blocks / 2);
        for i in 0..blocks {
            let namespace = NAMESPACES[i % NAMESPACES.len()];
            let material = MATERIALS[i % MATERIALS.len()];

            let block = resources.register_block(ResourceLocation::new(namespace, format!("block_{}", i)));
            let block_texture = ResourceLocation::new("minecraft", format!("block/{}", material));
            let sprite = atlas.stitch(&block_texture);

            descriptors.insert(
                ResourceLocation::new(namespace, format!("block/block_{}", i)),
                Descriptor::Block(Arc::new(block_descriptor(&cube_all, block_texture))),
            );

            let location = block.as_ref().clone();
            baked.put(
                ModelResourceLocation::new(location.clone(), "normal"),
                BakedModel::Simple(Arc::new(simple_block_model(&sprite, &block_format))),
            );
            if i % 4 == 3 {
                let fence = Arc::new(fence_model(&sprite, &block_format));
                tracker.track(fence.state_cache(), "multipart block states");
                baked.put(ModelResourceLocation::new(location, "multipart"), BakedModel::Multipart(fence));
            }
            block_keys.push(block);

            if i % 2 == 0 {
                let item = resources.register_item(ResourceLocation::new(namespace, format!("item_{}", i)));
                let item_texture = ResourceLocation::new("minecraft", format!("item/{}", material));
                atlas.stitch(&item_texture);

                let overrides = ItemOverrides::new(vec![ItemOverride {
                    model: Slot::from_value(ResourceLocation::new(namespace, format!("item/item_{}_pulled", i))),
                    predicates: vec![("pull".to_string(), 0.9)],
                }]);
                let descriptor = Arc::new(ItemLayerDescriptor::new(
                    vec![item_texture],
                    item_transforms(i % 4 == 2),
                    overrides,
                ));
                descriptors.insert(
                    ResourceLocation::new(namespace, format!("item/item_{}", i)),
                    Descriptor::ItemLayer(descriptor.clone()),
                );

                let model = baker
                    .bake(&descriptor, &item_format, &atlas, None, tracker)
                    .with_context(|| format!("Baking {}", item))?;
                baked.put(ModelResourceLocation::inventory(item.as_ref().clone()), model);
                item_keys.push(item);
            }
        }

        // Broken model files can name themselves as their parent.
        let looping = Arc::new(ModelDescriptor::default());
        looping.parent.store(Some(looping.clone()));
        descriptors.insert(ResourceLocation::parse("block/looping"), Descriptor::Block(looping));

        statics.add_block_stats("stat.mineBlock", "Blocks Mined", &block_keys);
        statics.add_block_stats("stat.useItem", "Items Used", &item_keys);

        info!(
            "Generated {} blocks, {} items and {} baked models ({} sprites)",
            block_keys.len(),
            item_keys.len(),
            baked.len(),
            atlas.len()
        );

        Ok(Self {
            resources,
            descriptors,
            statics,
            baked,
            atlas,
        })
    }
}
