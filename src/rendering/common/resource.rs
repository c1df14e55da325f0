use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// `namespace:path`, the key of nearly everything in the asset registries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceLocation {
    pub namespace: String,
    pub path: String,
}

impl ResourceLocation {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }

    /// Parses `namespace:path`, a missing namespace defaults to [`DEFAULT_NAMESPACE`].
    pub fn parse(input: &str) -> Self {
        match input.split_once(':') {
            Some((namespace, path)) if !namespace.is_empty() => Self::new(namespace, path),
            Some((_, path)) => Self::new(DEFAULT_NAMESPACE, path),
            None => Self::new(DEFAULT_NAMESPACE, input),
        }
    }
}

impl Display for ResourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for ResourceLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// A [`ResourceLocation`] plus the block state / inventory variant, `namespace:path#variant`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelResourceLocation {
    pub location: ResourceLocation,
    pub variant: String,
}

impl ModelResourceLocation {
    pub fn new(location: ResourceLocation, variant: impl Into<String>) -> Self {
        Self {
            location,
            variant: variant.into(),
        }
    }

    pub fn inventory(location: ResourceLocation) -> Self {
        Self::new(location, "inventory")
    }

    pub fn namespace(&self) -> &str {
        &self.location.namespace
    }

    pub fn path(&self) -> &str {
        &self.location.path
    }
}

impl Display for ModelResourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.location, self.variant)
    }
}

impl FromStr for ModelResourceLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (location, variant) = s
            .split_once('#')
            .ok_or_else(|| format!("Missing variant in {}", s))?;
        Ok(Self::new(ResourceLocation::parse(location), variant))
    }
}

#[cfg(test)]
mod tests {
    use crate::rendering::common::resource::{ModelResourceLocation, ResourceLocation};

    #[test]
    fn parse_defaults_the_namespace() {
        assert_eq!(
            ResourceLocation::parse("stone"),
            ResourceLocation::new("minecraft", "stone")
        );
        assert_eq!(
            ResourceLocation::parse(":stone"),
            ResourceLocation::new("minecraft", "stone")
        );
        assert_eq!(
            ResourceLocation::parse("mod:block/ore").to_string(),
            "mod:block/ore"
        );
    }

    #[test]
    fn model_locations_round_trip_through_display() {
        let parsed: ModelResourceLocation = "mod:lamp#lit=true".parse().unwrap();
        assert_eq!(parsed.namespace(), "mod");
        assert_eq!(parsed.path(), "lamp");
        assert_eq!(parsed.variant, "lit=true");
        assert_eq!(parsed.to_string(), "mod:lamp#lit=true");
        assert!("mod:lamp".parse::<ModelResourceLocation>().is_err());
    }
}
