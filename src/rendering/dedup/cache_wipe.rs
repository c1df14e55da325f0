use crate::rendering::common::resource::ResourceLocation;
use crate::rendering::dedup::registries::DescriptorCache;
use log::info;

const CORE_NAMESPACES: [&str; 3] = ["minecraft", "fml", "forge"];

/// Built-in descriptors survive a wipe: they are not backed by model files and cannot be loaded
/// again.
pub fn is_builtin(key: &ResourceLocation) -> bool {
    CORE_NAMESPACES.contains(&key.namespace.as_str())
        && (key.path.ends_with("/generated") || key.path.starts_with("builtin/"))
}

/// Drops every descriptor that can be reloaded from disk. Returns how many were removed.
pub fn wipe_descriptor_cache(cache: &mut dyn DescriptorCache) -> usize {
    let before = cache.len();
    cache.retain(&mut |key| is_builtin(key));
    let removed = before - cache.len();
    info!("Wiped {} of {} cached model descriptors", removed, before);
    removed
}

#[cfg(test)]
mod tests {
    use crate::rendering::common::resource::ResourceLocation;
    use crate::rendering::dedup::cache_wipe::{is_builtin, wipe_descriptor_cache};
    use crate::rendering::dedup::registries::{DescriptorCache, ModelCache};
    use crate::rendering::model::descriptor::{Descriptor, ModelDescriptor};
    use std::sync::Arc;

    #[test]
    fn builtin_keys_are_recognized() {
        assert!(is_builtin(&ResourceLocation::parse("builtin/generated")));
        assert!(is_builtin(&ResourceLocation::parse("forge:item/generated")));
        assert!(is_builtin(&ResourceLocation::parse("fml:builtin/entity")));
        assert!(!is_builtin(&ResourceLocation::parse("block/stone")));
        assert!(!is_builtin(&ResourceLocation::parse("mymod:builtin/generated")));
        assert!(!is_builtin(&ResourceLocation::parse("minecraft:item/generated_extra")));
    }

    #[test_log::test]
    fn only_builtin_descriptors_survive() {
        let mut cache = ModelCache::new();
        for key in ["builtin/generated", "item/generated", "block/stone", "mymod:block/ore", "forge:builtin/x"] {
            cache.insert(
                ResourceLocation::parse(key),
                Descriptor::Block(Arc::new(ModelDescriptor::default())),
            );
        }

        assert_eq!(wipe_descriptor_cache(&mut cache), 2);
        assert_eq!(
            cache.keys(),
            ["forge:builtin/x", "minecraft:builtin/generated", "minecraft:item/generated"]
                .map(ResourceLocation::parse)
                .to_vec()
        );
    }
}
