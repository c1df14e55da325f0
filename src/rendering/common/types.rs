use crate::rendering::common::resource::ResourceLocation;
use glam::Vec3;
use itertools::Itertools;
use modelfoam_intern::Value;
use modelfoam_intern::containers::{MapKey, NodeList, Slot};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Facing {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Facing {
    pub const ALL: [Facing; 6] = [
        Facing::Down,
        Facing::Up,
        Facing::North,
        Facing::South,
        Facing::West,
        Facing::East,
    ];

    pub fn normal(self) -> Vec3 {
        match self {
            Facing::Down => Vec3::NEG_Y,
            Facing::Up => Vec3::Y,
            Facing::North => Vec3::NEG_Z,
            Facing::South => Vec3::Z,
            Facing::West => Vec3::NEG_X,
            Facing::East => Vec3::X,
        }
    }
}

impl MapKey for Facing {
    fn to_value(&self) -> Value {
        Value::from(*self as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementUsage {
    Position,
    Color,
    Uv,
    Normal,
    Padding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Float,
    UByte,
    Byte,
    Short,
}

impl ElementType {
    pub fn size(self) -> usize {
        match self {
            ElementType::Float => 4,
            ElementType::UByte | ElementType::Byte => 1,
            ElementType::Short => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexFormatElement {
    pub usage: ElementUsage,
    pub kind: ElementType,
    pub index: u32,
    pub count: u32,
}

impl VertexFormatElement {
    pub fn new(usage: ElementUsage, kind: ElementType, index: u32, count: u32) -> Self {
        Self {
            usage,
            kind,
            index,
            count,
        }
    }

    pub fn size(&self) -> usize {
        self.kind.size() * self.count as usize
    }
}

/// The layout of one vertex inside [`BakedQuad::vertex_data`].
pub struct VertexFormat {
    pub elements: Slot<NodeList<VertexFormatElement>>,
}

impl VertexFormat {
    pub fn new(elements: impl IntoIterator<Item = VertexFormatElement>) -> Self {
        Self {
            elements: Slot::from_value(NodeList::from_values(elements)),
        }
    }

    fn position() -> VertexFormatElement {
        VertexFormatElement::new(ElementUsage::Position, ElementType::Float, 0, 3)
    }

    fn color() -> VertexFormatElement {
        VertexFormatElement::new(ElementUsage::Color, ElementType::UByte, 0, 4)
    }

    fn texture() -> VertexFormatElement {
        VertexFormatElement::new(ElementUsage::Uv, ElementType::Float, 0, 2)
    }

    fn lightmap() -> VertexFormatElement {
        VertexFormatElement::new(ElementUsage::Uv, ElementType::Short, 1, 2)
    }

    fn normal() -> VertexFormatElement {
        VertexFormatElement::new(ElementUsage::Normal, ElementType::Byte, 0, 3)
    }

    fn padding() -> VertexFormatElement {
        VertexFormatElement::new(ElementUsage::Padding, ElementType::Byte, 0, 1)
    }

    pub fn block() -> Self {
        Self::new([Self::position(), Self::color(), Self::texture(), Self::lightmap()])
    }

    pub fn item() -> Self {
        Self::new([Self::position(), Self::color(), Self::texture(), Self::normal(), Self::padding()])
    }

    pub fn position_tex() -> Self {
        Self::new([Self::position(), Self::texture()])
    }

    pub fn position_tex_color_normal() -> Self {
        Self::new([Self::position(), Self::texture(), Self::color(), Self::normal(), Self::padding()])
    }

    pub fn element_list(&self) -> Vec<Arc<VertexFormatElement>> {
        self.elements.load().to_vec()
    }

    /// Size of one vertex in 32 bit words.
    pub fn integer_size(&self) -> usize {
        self.element_list()
            .iter()
            .map(|element| element.size())
            .sum::<usize>()
            .div_ceil(4)
    }
}

impl Debug for VertexFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let usages = self
            .element_list()
            .iter()
            .map(|element| format!("{:?}{}", element.usage, element.index))
            .join(", ");
        write!(f, "VertexFormat [{}]", usages)
    }
}

/// A region of the texture atlas. The atlas hands these out by name, so their identity matters.
pub struct Sprite {
    pub name: Slot<ResourceLocation>,
    pub width: u32,
    pub height: u32,
    pub min_u: f32,
    pub max_u: f32,
    pub min_v: f32,
    pub max_v: f32,
}

impl Sprite {
    pub fn new(name: ResourceLocation, width: u32, height: u32, uv: [f32; 4]) -> Self {
        Self {
            name: Slot::from_value(name),
            width,
            height,
            min_u: uv[0],
            max_u: uv[1],
            min_v: uv[2],
            max_v: uv[3],
        }
    }

    /// Interpolated atlas U for a texel coordinate in `0..=16`.
    pub fn interpolated_u(&self, u: f32) -> f32 {
        self.min_u + (self.max_u - self.min_u) * u / 16.0
    }

    pub fn interpolated_v(&self, v: f32) -> f32 {
        self.min_v + (self.max_v - self.min_v) * v / 16.0
    }
}

impl Debug for Sprite {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sprite({}, {}x{})", self.name.load(), self.width, self.height)
    }
}

pub struct BakedQuad {
    pub vertex_data: Arc<[i32]>,
    pub tint_index: i32,
    pub face: Facing,
    pub sprite: Slot<Sprite>,
    pub format: Slot<VertexFormat>,
    pub shade: bool,
}

impl BakedQuad {
    pub fn has_tint(&self) -> bool {
        self.tint_index != -1
    }
}

impl Debug for BakedQuad {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BakedQuad")
            .field("face", &self.face)
            .field("tint_index", &self.tint_index)
            .field("vertex_data", &self.vertex_data.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatFormatter {
    Simple,
    Time,
    Distance,
    Divide,
}

impl StatFormatter {
    pub fn format(self, value: i64) -> String {
        match self {
            StatFormatter::Simple => value.to_string(),
            StatFormatter::Time => format!("{:.2} h", value as f64 / 20.0 / 3600.0),
            StatFormatter::Distance => format!("{:.2} m", value as f64 / 100.0),
            StatFormatter::Divide => format!("{:.2}", value as f64 * 0.1),
        }
    }
}

/// A tracked statistic. The ids are unique, the names and formatters are mostly shared.
#[derive(Debug)]
pub struct Stat {
    pub id: String,
    pub name: Slot<String>,
    pub formatter: Slot<StatFormatter>,
}

impl Stat {
    pub fn new(id: impl Into<String>, name: impl Into<String>, formatter: StatFormatter) -> Self {
        Self {
            id: id.into(),
            name: Slot::from_value(name.into()),
            formatter: Slot::from_value(formatter),
        }
    }
}

#[derive(Debug)]
pub struct ItemOverride {
    pub model: Slot<ResourceLocation>,
    pub predicates: Vec<(String, f32)>,
}

impl ItemOverride {
    pub fn matches(&self, properties: &[(&str, f32)]) -> bool {
        self.predicates.iter().all(|(name, threshold)| {
            properties
                .iter()
                .any(|(property, value)| property == name && value >= threshold)
        })
    }
}

/// Picks a different model for an item stack depending on its properties.
#[derive(Debug)]
pub struct ItemOverrides {
    pub entries: Slot<NodeList<ItemOverride>>,
}

impl ItemOverrides {
    pub fn new(entries: Vec<ItemOverride>) -> Self {
        Self {
            entries: Slot::from_value(NodeList::from_values(entries)),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The last matching override wins.
    pub fn resolve(&self, properties: &[(&str, f32)]) -> Option<Arc<ResourceLocation>> {
        self.entries
            .load()
            .to_vec()
            .iter()
            .rev()
            .find(|entry| entry.matches(properties))
            .map(|entry| entry.model.load())
    }
}
