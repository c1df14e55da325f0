use crate::rendering::baking::atlas::TextureAtlas;
use crate::rendering::baking::quads::{QuadRequest, front_corners, quads_for_sprite};
use crate::rendering::common::transform::{Transform, TransformType, perspective};
use crate::rendering::common::types::{BakedQuad, Facing, ItemOverrides, Sprite, VertexFormat};
use crate::rendering::model::baked::{BakedModel, Dynamic3DItemModel, DynamicItemParts, QuadSource, StaticItemModel};
use crate::rendering::model::descriptor::ItemLayerDescriptor;
use crate::util::weak_dashmap::SlotTracker;
use anyhow::{Context, anyhow};
use log::{trace, warn};
use modelfoam_intern::Handle;
use modelfoam_intern::capability::{Capabilities, FieldAccessor, MethodAccessor, downcast_handle};
use modelfoam_intern::containers::{NodeList, Slot};
use std::sync::Arc;

/// Builds a single quad without generating the faces around it: `(VertexFormat, Sprite, QuadRequest)`.
pub const BUILD_QUAD: &str = "build_quad(VertexFormat, Sprite, QuadRequest)";

/// Bakes generated item models (one flat layer per texture).
pub struct ItemLayerBaker {
    overrides: FieldAccessor,
    build_quad: Option<MethodAccessor>,
}

impl ItemLayerBaker {
    pub fn new(capabilities: &Capabilities) -> anyhow::Result<Self> {
        let overrides = capabilities
            .resolve_field::<ItemLayerDescriptor>("overrides")
            .context("Item layer descriptors do not expose their overrides")?;

        let build_quad = match capabilities.resolve_method::<ItemLayerDescriptor>(BUILD_QUAD) {
            Ok(method) => Some(method),
            Err(err) => {
                warn!("Could not resolve the quad builder, baking items the slow way: {}", err);
                None
            }
        };

        Ok(Self { overrides, build_quad })
    }

    pub fn has_fast_path(&self) -> bool {
        self.build_quad.is_some()
    }

    fn overrides_of(&self, descriptor: &ItemLayerDescriptor) -> anyhow::Result<Arc<ItemOverrides>> {
        match self.overrides.get(descriptor)? {
            Some(handle) => Ok(downcast_handle::<ItemOverrides>(handle, "overrides")?),
            None => Ok(Arc::new(ItemOverrides::empty())),
        }
    }

    fn front_quad(
        &self,
        descriptor: &ItemLayerDescriptor,
        tint_index: i32,
        sprite: &Arc<Sprite>,
        format: &Arc<VertexFormat>,
        transform: Option<Transform>,
    ) -> anyhow::Result<Arc<BakedQuad>> {
        if let Some(build_quad) = &self.build_quad {
            let request = QuadRequest {
                transform,
                face: Facing::South,
                tint_index,
                corners: front_corners(),
            };
            let args: [Handle; 3] = [format.clone(), sprite.clone(), Arc::new(request)];
            let quad = build_quad.invoke(descriptor, &args)?;
            return Ok(downcast_handle::<BakedQuad>(quad, BUILD_QUAD)?);
        }

        quads_for_sprite(tint_index, sprite, format, transform)
            .into_iter()
            .find(|quad| quad.face == Facing::South)
            .ok_or_else(|| anyhow!("Layer {} has no front face", tint_index))
    }

    /// Bakes `descriptor` in `format`. `transform` is the rotation of the model state, if any.
    ///
    /// The lazily computed quads of the result are registered with `tracker`, so they can be
    /// dropped under memory pressure.
    pub fn bake(
        &self,
        descriptor: &Arc<ItemLayerDescriptor>,
        format: &Arc<VertexFormat>,
        atlas: &TextureAtlas,
        transform: Option<Transform>,
        tracker: &SlotTracker,
    ) -> anyhow::Result<BakedModel> {
        let overrides = self.overrides_of(descriptor)?;
        let transforms = descriptor.transforms.load();
        let sprites = descriptor
            .textures
            .load()
            .to_vec()
            .iter()
            .map(|location| atlas.sprite_or_missing(location))
            .collect::<Vec<_>>();
        let particle = sprites
            .first()
            .cloned()
            .unwrap_or_else(|| atlas.missing().clone());

        let source = QuadSource {
            sprites: Slot::from_value(NodeList::new(sprites.clone())),
            format: Slot::new(format.clone()),
            transform,
        };

        if perspective(&transforms, TransformType::Gui).is_some() {
            trace!("Baking a static item with {} layers", sprites.len());
            let model = Arc::new(StaticItemModel::new(transforms, particle, overrides, source));
            tracker.track(model.lazy_quads(), "static item quads");
            return Ok(BakedModel::StaticItem(model));
        }

        let fast_quads = sprites
            .iter()
            .enumerate()
            .map(|(index, sprite)| self.front_quad(descriptor, index as i32, sprite, format, transform))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let model = Dynamic3DItemModel::new(DynamicItemParts {
            fast_quads,
            particle,
            transforms,
            overrides,
            source,
        });
        tracker.track(model.lazy_quads(), "dynamic item quads");
        Ok(BakedModel::DynamicItem3D(model))
    }
}

#[cfg(test)]
mod tests;
