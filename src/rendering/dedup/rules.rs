use crate::rendering::common::resource::{ModelResourceLocation, ResourceLocation};
use crate::rendering::common::transform::{Transform, TransformType};
use crate::rendering::common::types::{
    BakedQuad, Facing, ItemOverride, ItemOverrides, Sprite, Stat, StatFormatter, VertexFormat, VertexFormatElement,
};
use crate::rendering::model::baked::{
    CompactMultipartModel, Dynamic3DItemModel, DynamicItemModel, MultipartPart, QuadSource, SimpleBakedModel, StaticItemModel,
};
use crate::rendering::model::descriptor::{ElementFace, ItemLayerDescriptor, ModelDescriptor, ModelElement};
use anyhow::Context;
use log::warn;
use modelfoam_intern::capability::Capabilities;
use modelfoam_intern::containers::{MapKey, NodeList};
use modelfoam_intern::rules::{Leaf, Map, Record, Registry, Sequence};
use modelfoam_intern::{DedupError, NodeId};

fn leaves(registry: &mut Registry) {
    registry
        .register(Leaf::<String>::new("String", |value, fp| {
            fp.push(value);
        }))
        .register(Leaf::<ResourceLocation>::new("ResourceLocation", |location, fp| {
            fp.push(&location.namespace).push(&location.path);
        }))
        .register(Leaf::<ModelResourceLocation>::new("ModelResourceLocation", |location, fp| {
            fp.push(location.namespace())
                .push(location.path())
                .push(&location.variant);
        }))
        .register(Leaf::<VertexFormatElement>::new("VertexFormatElement", |element, fp| {
            fp.push(element.usage as u32)
                .push(element.kind as u32)
                .push(element.index)
                .push(element.count);
        }))
        .register(Leaf::<Transform>::new("Transform", |transform, fp| {
            fp.push_floats(&transform.matrix.to_cols_array());
        }))
        .register(Leaf::<StatFormatter>::new("StatFormatter", |formatter, fp| {
            fp.push(*formatter as u32);
        }));
}

fn containers(registry: &mut Registry) {
    registry
        .register(Sequence::<VertexFormatElement>::named("VertexFormatElement[]"))
        .register(Sequence::<BakedQuad>::named("BakedQuad[]"))
        .register(Sequence::<ModelElement>::named("ModelElement[]"))
        .register(Sequence::<ResourceLocation>::named("ResourceLocation[]"))
        .register(Sequence::<ItemOverride>::named("ItemOverride[]"))
        .register(Sequence::<MultipartPart>::named("MultipartPart[]"))
        .register(Sequence::<Sprite>::named("Sprite[]"))
        .register(Sequence::<Stat>::named("Stat[]"))
        .register(Map::<TransformType, Transform>::named("TransformMap"))
        .register(Map::<Facing, ElementFace>::named("FaceMap"))
        .register(Map::<Facing, NodeList<BakedQuad>>::named("FaceQuadMap"))
        .register(Map::<String, ResourceLocation>::named("TextureMap"));
}

/// Rules every other rule builds on: without them, nothing that contains quads can be merged.
fn foundational(capabilities: &Capabilities, registry: &mut Registry) -> Result<(), DedupError> {
    registry
        .register(
            Record::<VertexFormat>::builder(capabilities, "VertexFormat")
                .field("elements")
                .build()?,
        )
        .register(
            Record::<BakedQuad>::builder(capabilities, "BakedQuad")
                .field("sprite")
                .field("format")
                .intrinsic(|quad, fp| {
                    fp.push(&quad.vertex_data[..])
                        .push(quad.tint_index)
                        .push(quad.face.to_value())
                        .push(quad.shade);
                })
                .build()?,
        );
    Ok(())
}

type RuleBuilder = fn(&Capabilities, &mut Registry) -> Result<(), DedupError>;

fn render_types(capabilities: &Capabilities, registry: &mut Registry) -> Result<(), DedupError> {
    registry
        .register(
            // The atlas hands out sprites by name, replacing one would detach it from the atlas.
            Record::<Sprite>::builder(capabilities, "Sprite")
                .field("name")
                .traverse_only()
                .build()?,
        )
        .register(
            Record::<Stat>::builder(capabilities, "Stat")
                .field("name")
                .field("formatter")
                .intrinsic(|stat, fp| {
                    fp.push(&stat.id);
                })
                .build()?,
        )
        .register(
            Record::<ItemOverride>::builder(capabilities, "ItemOverride")
                .field("model")
                .intrinsic(|entry, fp| {
                    for (name, threshold) in &entry.predicates {
                        fp.push(name).push(*threshold);
                    }
                })
                .build()?,
        )
        .register(
            Record::<ItemOverrides>::builder(capabilities, "ItemOverrides")
                .field("entries")
                .build()?,
        );
    Ok(())
}

fn descriptors(capabilities: &Capabilities, registry: &mut Registry) -> Result<(), DedupError> {
    registry
        .register(
            Record::<ElementFace>::builder(capabilities, "ElementFace")
                .field("texture")
                .intrinsic(|face, fp| {
                    fp.push_floats(&face.uv)
                        .push(face.cull_face.map_or(u32::MAX, |facing| facing as u32))
                        .push(face.tint_index)
                        .push(face.rotation);
                })
                .build()?,
        )
        .register(
            Record::<ModelElement>::builder(capabilities, "ModelElement")
                .field("faces")
                .intrinsic(|element, fp| {
                    fp.push_floats(&element.from.to_array())
                        .push_floats(&element.to.to_array())
                        .push(element.shade);
                })
                .build()?,
        )
        .register(
            Record::<ModelDescriptor>::builder(capabilities, "ModelDescriptor")
                .field("parent_location")
                .field("parent")
                .field("elements")
                .field("textures")
                .field("transforms")
                .intrinsic(|descriptor, fp| {
                    fp.push(descriptor.ambient_occlusion)
                        .push(descriptor.gui_3d);
                })
                .build()?,
        )
        .register(
            Record::<ItemLayerDescriptor>::builder(capabilities, "ItemLayerDescriptor")
                .field("textures")
                .field("transforms")
                .field("overrides")
                .build()?,
        );
    Ok(())
}

fn baked_models(capabilities: &Capabilities, registry: &mut Registry) -> Result<(), DedupError> {
    registry
        .register(
            Record::<SimpleBakedModel>::builder(capabilities, "SimpleBakedModel")
                .field("general_quads")
                .field("face_quads")
                .field("particle")
                .field("transforms")
                .field("overrides")
                .intrinsic(|model, fp| {
                    fp.push(model.ambient_occlusion).push(model.gui_3d);
                })
                .build()?,
        )
        .register(
            Record::<MultipartPart>::builder(capabilities, "MultipartPart")
                .field("condition")
                .field("model")
                .build()?,
        )
        .register(
            Record::<CompactMultipartModel>::builder(capabilities, "CompactMultipartModel")
                .field("parts")
                .intrinsic(|model, fp| {
                    fp.push(model.ambient_occlusion).push(model.gui_3d);
                    match &model.particle {
                        Some(particle) => fp.push_identity(NodeId::of_arc(particle)),
                        None => fp.push(false),
                    };
                })
                .build()?,
        )
        .register(
            Record::<QuadSource>::builder(capabilities, "QuadSource")
                .field("sprites")
                .field("format")
                .intrinsic(|source, fp| match source.transform {
                    Some(transform) => {
                        fp.push_floats(&transform.matrix.to_cols_array());
                    }
                    None => {
                        fp.push(false);
                    }
                })
                .build()?,
        )
        // Items keep their lazily baked quads, so they are only ever trimmed.
        .register(
            Record::<StaticItemModel>::builder(capabilities, "StaticItemModel")
                .field("transforms")
                .field("particle")
                .field("overrides")
                .field("source")
                .traverse_only()
                .build()?,
        )
        .register(
            Record::<DynamicItemModel>::builder(capabilities, "DynamicItemModel")
                .field("fast_quads")
                .field("particle")
                .field("transforms")
                .field("overrides")
                .field("source")
                .traverse_only()
                .build()?,
        )
        .register(
            Record::<Dynamic3DItemModel>::builder(capabilities, "Dynamic3DItemModel")
                .field("parent")
                .traverse_only()
                .build()?,
        );
    Ok(())
}

/// Builds the rules for every type of the render model.
///
/// Vertex formats and quads are required. Any other group whose accessors are missing is skipped
/// with a warning, which turns its types into leaves.
pub fn register_host_rules(capabilities: &Capabilities) -> anyhow::Result<Registry> {
    let mut registry = Registry::new();
    leaves(&mut registry);
    containers(&mut registry);
    foundational(capabilities, &mut registry).context("Vertex formats and quads cannot be deduplicated")?;

    let optional: [(&str, RuleBuilder); 3] = [
        ("render types", render_types),
        ("model descriptors", descriptors),
        ("baked models", baked_models),
    ];

    for (group, build) in optional {
        // Built into a scratch registry, so a group is registered completely or not at all.
        let mut rules = Registry::new();
        match build(capabilities, &mut rules) {
            Ok(()) => {
                registry.extend(rules);
            }
            Err(err) => warn!("Not deduplicating {}: {}", group, err),
        }
    }

    Ok(registry)
}
