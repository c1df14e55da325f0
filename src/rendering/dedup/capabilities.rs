use crate::rendering::baking::item_layer::BUILD_QUAD;
use crate::rendering::baking::quads::{QuadRequest, build_quad};
use crate::rendering::common::types::{BakedQuad, ItemOverride, ItemOverrides, Sprite, Stat, VertexFormat};
use crate::rendering::model::baked::{
    CompactMultipartModel, Dynamic3DItemModel, DynamicItemModel, MultipartPart, QuadSource, SimpleBakedModel, StaticItemModel,
};
use crate::rendering::model::descriptor::{ElementFace, ItemLayerDescriptor, ModelDescriptor, ModelElement};
use modelfoam_intern::capability::{Capabilities, downcast_handle};
use modelfoam_intern::{DedupError, Handle};
use std::sync::Arc;

fn render_types(capabilities: &mut Capabilities) {
    capabilities
        .register_slot::<VertexFormat, _>("elements", |format| &format.elements)
        .register_slot::<Sprite, _>("name", |sprite| &sprite.name)
        .register_slot::<BakedQuad, _>("sprite", |quad| &quad.sprite)
        .register_slot::<BakedQuad, _>("format", |quad| &quad.format)
        .register_slot::<Stat, _>("name", |stat| &stat.name)
        .register_slot::<Stat, _>("formatter", |stat| &stat.formatter)
        .register_slot::<ItemOverride, _>("model", |entry| &entry.model)
        .register_slot::<ItemOverrides, _>("entries", |overrides| &overrides.entries);
}

fn descriptors(capabilities: &mut Capabilities) {
    capabilities
        .register_slot::<ElementFace, _>("texture", |face| &face.texture)
        .register_slot::<ModelElement, _>("faces", |element| &element.faces)
        .register_optional_slot::<ModelDescriptor, _>("parent_location", |descriptor| &descriptor.parent_location)
        .register_optional_slot::<ModelDescriptor, _>("parent", |descriptor| &descriptor.parent)
        .register_slot::<ModelDescriptor, _>("elements", |descriptor| &descriptor.elements)
        .register_slot::<ModelDescriptor, _>("textures", |descriptor| &descriptor.textures)
        .register_slot::<ModelDescriptor, _>("transforms", |descriptor| &descriptor.transforms)
        .register_slot::<ItemLayerDescriptor, _>("textures", |descriptor| &descriptor.textures)
        .register_slot::<ItemLayerDescriptor, _>("transforms", |descriptor| &descriptor.transforms)
        .register_slot::<ItemLayerDescriptor, _>("overrides", |descriptor| &descriptor.overrides);
}

fn baked_models(capabilities: &mut Capabilities) {
    capabilities
        .register_slot::<SimpleBakedModel, _>("general_quads", |model| &model.general_quads)
        .register_slot::<SimpleBakedModel, _>("face_quads", |model| &model.face_quads)
        .register_slot::<SimpleBakedModel, _>("particle", |model| &model.particle)
        .register_slot::<SimpleBakedModel, _>("transforms", |model| &model.transforms)
        .register_slot::<SimpleBakedModel, _>("overrides", |model| &model.overrides)
        .register_slot::<MultipartPart, _>("condition", |part| &part.condition)
        .register_slot::<MultipartPart, _>("model", |part| &part.model)
        .register_slot::<CompactMultipartModel, _>("parts", |model| &model.parts)
        .register_slot::<QuadSource, _>("sprites", |source| &source.sprites)
        .register_slot::<QuadSource, _>("format", |source| &source.format)
        .register_slot::<StaticItemModel, _>("transforms", |model| &model.transforms)
        .register_slot::<StaticItemModel, _>("particle", |model| &model.particle)
        .register_slot::<StaticItemModel, _>("overrides", |model| &model.overrides)
        .register_slot::<StaticItemModel, _>("source", |model| &model.source)
        .register_slot::<DynamicItemModel, _>("fast_quads", |model| &model.fast_quads)
        .register_slot::<DynamicItemModel, _>("particle", |model| &model.particle)
        .register_slot::<DynamicItemModel, _>("transforms", |model| &model.transforms)
        .register_slot::<DynamicItemModel, _>("overrides", |model| &model.overrides)
        .register_slot::<DynamicItemModel, _>("source", |model| &model.source)
        // The flat variant points back at the 3D one, it is never swapped out.
        .register_field::<Dynamic3DItemModel, _>("parent", |model| Some(model.parent.clone() as Handle));
}

fn invoke_build_quad(args: &[Handle]) -> Result<Handle, DedupError> {
    let [format, sprite, request] = args else {
        return Err(DedupError::TypeMismatch {
            expected: "(VertexFormat, Sprite, QuadRequest)",
            name: BUILD_QUAD,
        });
    };

    let format = downcast_handle::<VertexFormat>(format.clone(), BUILD_QUAD)?;
    let sprite = downcast_handle::<Sprite>(sprite.clone(), BUILD_QUAD)?;
    let request = downcast_handle::<QuadRequest>(request.clone(), BUILD_QUAD)?;
    Ok(Arc::new(build_quad(&format, &sprite, &request)) as Handle)
}

/// Every field and method of the render model that the deduplication rules and the item baker
/// rely on.
pub fn host_capabilities() -> Capabilities {
    let mut capabilities = Capabilities::new();
    render_types(&mut capabilities);
    descriptors(&mut capabilities);
    baked_models(&mut capabilities);
    capabilities.register_method::<ItemLayerDescriptor, _>(BUILD_QUAD, |_, args| invoke_build_quad(args));
    capabilities
}
