use crate::rendering::common::resource::ResourceLocation;
use crate::rendering::common::types::Sprite;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Sprites per row and column, every sprite gets an equally sized cell.
const CELLS: u32 = 64;
const SPRITE_SIZE: u32 = 16;

/// A stand-in for the stitched block/item texture atlas. Sprites are handed out by name and the
/// same name always yields the same instance.
#[derive(Debug)]
pub struct TextureAtlas {
    sprites: BTreeMap<ResourceLocation, Arc<Sprite>>,
    missing: Arc<Sprite>,
}

fn cell(index: u32, name: ResourceLocation) -> Sprite {
    let step = 1.0 / CELLS as f32;
    let (column, row) = ((index % CELLS) as f32, ((index / CELLS) % CELLS) as f32);
    Sprite::new(
        name,
        SPRITE_SIZE,
        SPRITE_SIZE,
        [column * step, (column + 1.0) * step, row * step, (row + 1.0) * step],
    )
}

impl TextureAtlas {
    pub fn new() -> Self {
        Self {
            sprites: BTreeMap::new(),
            missing: Arc::new(cell(0, ResourceLocation::parse("missingno"))),
        }
    }

    /// Adds a sprite for `location`, or returns the one that is already there.
    pub fn stitch(&mut self, location: &ResourceLocation) -> Arc<Sprite> {
        let index = self.sprites.len() as u32 + 1;
        self.sprites
            .entry(location.clone())
            .or_insert_with(|| Arc::new(cell(index, location.clone())))
            .clone()
    }

    pub fn sprite(&self, location: &ResourceLocation) -> Option<Arc<Sprite>> {
        self.sprites.get(location).cloned()
    }

    /// Like [`TextureAtlas::sprite`], but unknown locations get the missing texture.
    pub fn sprite_or_missing(&self, location: &ResourceLocation) -> Arc<Sprite> {
        self.sprite(location)
            .unwrap_or_else(|| self.missing.clone())
    }

    pub fn missing(&self) -> &Arc<Sprite> {
        &self.missing
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

impl Default for TextureAtlas {
    fn default() -> Self {
        Self::new()
    }
}
