use crate::demo::item_transforms;
use crate::rendering::baking::atlas::TextureAtlas;
use crate::rendering::baking::item_layer::ItemLayerBaker;
use crate::rendering::common::resource::ResourceLocation;
use crate::rendering::common::transform::TransformType;
use crate::rendering::common::types::{Facing, ItemOverrides, VertexFormat};
use crate::rendering::dedup::capabilities::host_capabilities;
use crate::rendering::model::baked::BakedModel;
use crate::rendering::model::descriptor::ItemLayerDescriptor;
use crate::util::weak_dashmap::SlotTracker;
use modelfoam_intern::capability::Capabilities;
use std::sync::Arc;

fn descriptor(gui_3d: bool) -> Arc<ItemLayerDescriptor> {
    Arc::new(ItemLayerDescriptor::new(
        vec![
            ResourceLocation::parse("item/bow"),
            ResourceLocation::parse("item/bow_string"),
        ],
        item_transforms(gui_3d),
        ItemOverrides::empty(),
    ))
}

fn atlas() -> TextureAtlas {
    let mut atlas = TextureAtlas::new();
    atlas.stitch(&ResourceLocation::parse("item/bow"));
    atlas.stitch(&ResourceLocation::parse("item/bow_string"));
    atlas
}

/// Only what the slow path needs: the overrides, but no quad builder.
fn slow_capabilities() -> Capabilities {
    let mut capabilities = Capabilities::new();
    capabilities.register_slot::<ItemLayerDescriptor, ItemOverrides>("overrides", |descriptor| &descriptor.overrides);
    capabilities
}

#[test_log::test]
fn baking_requires_the_overrides() {
    assert!(ItemLayerBaker::new(&Capabilities::new()).is_err());
    assert!(!ItemLayerBaker::new(&slow_capabilities()).unwrap().has_fast_path());
    assert!(ItemLayerBaker::new(&host_capabilities()).unwrap().has_fast_path());
}

#[test_log::test]
fn fast_and_slow_path_bake_the_same_front_faces() -> anyhow::Result<()> {
    let tracker = SlotTracker::new();
    let atlas = atlas();
    let format = Arc::new(VertexFormat::item());
    let descriptor = descriptor(false);

    let fast = ItemLayerBaker::new(&host_capabilities())?.bake(&descriptor, &format, &atlas, None, &tracker)?;
    let slow = ItemLayerBaker::new(&slow_capabilities())?.bake(&descriptor, &format, &atlas, None, &tracker)?;

    let (BakedModel::DynamicItem3D(fast), BakedModel::DynamicItem3D(slow)) = (fast, slow) else {
        panic!("Items without a GUI transform are baked as dynamic items");
    };

    let fast_quads = fast.parent.fast_quads.load().to_vec();
    let slow_quads = slow.parent.fast_quads.load().to_vec();
    assert_eq!(fast_quads.len(), 2);
    assert_eq!(slow_quads.len(), 2);
    for (fast, slow) in fast_quads.iter().zip(&slow_quads) {
        assert_eq!(fast.face, Facing::South);
        assert_eq!(fast.vertex_data, slow.vertex_data);
        assert_eq!(fast.tint_index, slow.tint_index);
    }
    Ok(())
}

#[test_log::test]
fn gui_transforms_make_static_items() -> anyhow::Result<()> {
    let tracker = SlotTracker::new();
    let baker = ItemLayerBaker::new(&host_capabilities())?;
    let format = Arc::new(VertexFormat::item());

    let model = baker.bake(&descriptor(true), &format, &atlas(), None, &tracker)?;
    let BakedModel::StaticItem(model) = model else {
        panic!("Items with a GUI transform are baked as static items");
    };

    assert!(!model.lazy_quads().is_present());
    // Both faces of both layers, only for the unculled side.
    assert_eq!(model.quads(None).len(), 4);
    assert!(model.quads(Some(Facing::Up)).is_empty());
    assert!(model.handle_perspective(TransformType::Gui).is_some());
    Ok(())
}

#[test_log::test]
fn lazy_quads_are_rebaked_after_reclaiming() -> anyhow::Result<()> {
    let tracker = SlotTracker::new();
    let baker = ItemLayerBaker::new(&host_capabilities())?;
    let format = Arc::new(VertexFormat::item());

    let model = baker.bake(&descriptor(false), &format, &atlas(), None, &tracker)?;
    let BakedModel::DynamicItem3D(model) = model else {
        panic!("Items without a GUI transform are baked as dynamic items");
    };

    let first = model.quads(None);
    assert!(Arc::ptr_eq(&first, &model.quads(None)));

    assert_eq!(tracker.reclaim_all(), 1);
    assert!(!model.lazy_quads().is_present());

    let second = model.quads(None);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.vertex_data, b.vertex_data);
    }
    Ok(())
}

#[test_log::test]
fn dynamic_items_switch_variants_per_perspective() -> anyhow::Result<()> {
    let tracker = SlotTracker::new();
    let baker = ItemLayerBaker::new(&host_capabilities())?;
    let format = Arc::new(VertexFormat::item());

    let BakedModel::DynamicItem3D(model) = baker.bake(&descriptor(false), &format, &atlas(), None, &tracker)? else {
        panic!("Items without a GUI transform are baked as dynamic items");
    };

    let (flat, matrix) = model.handle_perspective(TransformType::Gui);
    assert!(matches!(flat, BakedModel::DynamicItem(_)));
    assert!(matrix.is_none());
    // The flat variant only has the front faces.
    assert_eq!(flat.quads("", None).len(), 2);

    let (ground, matrix) = model.handle_perspective(TransformType::Ground);
    assert!(matches!(ground, BakedModel::DynamicItem3D(_)));
    assert!(matrix.is_some());

    let BakedModel::DynamicItem(flat) = flat else { unreachable!() };
    let (back, _) = flat.handle_perspective(TransformType::Head);
    assert!(back.same_instance(&BakedModel::DynamicItem3D(model)));
    Ok(())
}
