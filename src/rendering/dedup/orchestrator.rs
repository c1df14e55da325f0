use crate::rendering::dedup::cache_wipe::wipe_descriptor_cache;
use crate::rendering::dedup::registries::{BakedModelTable, DescriptorCache, ModelCache, ResourceRegistry, StaticRoots};
use crate::rendering::dedup::rules::register_host_rules;
use crate::rendering::model::baked::{BakedModel, CompactMultipartModel};
use crate::settings::DedupConfig;
use log::{debug, error, info, trace};
use modelfoam_intern::capability::Capabilities;
use modelfoam_intern::index::TypeStats;
use modelfoam_intern::rules::Registry;
use modelfoam_intern::{Deduplicator, Handle};
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DedupSummary {
    pub full_replacements: usize,
    pub partial_trims: usize,
    pub roots_visited: usize,
    pub failures: usize,
    /// Sorted by replacements, most replaced type first.
    pub per_type: Vec<(&'static str, TypeStats)>,
}

/// Receives the progress of a run. Bars can be nested.
pub trait ProgressSink {
    fn push(&mut self, title: &str, steps: usize);

    fn step(&mut self, message: &str);

    fn pop(&mut self);
}

struct Bar {
    title: String,
    steps: usize,
    current: usize,
}

/// Reports progress to the log.
#[derive(Default)]
pub struct LogProgress {
    bars: Vec<Bar>,
}

impl ProgressSink for LogProgress {
    fn push(&mut self, title: &str, steps: usize) {
        debug!("{} ({} steps)", title, steps);
        self.bars.push(Bar {
            title: title.to_string(),
            steps,
            current: 0,
        });
    }

    fn step(&mut self, message: &str) {
        if let Some(bar) = self.bars.last_mut() {
            bar.current += 1;
            info!("{} [{}/{}]: {}", bar.title, bar.current, bar.steps, message);
        }
    }

    fn pop(&mut self) {
        if let Some(bar) = self.bars.pop() {
            debug!("{} done", bar.title);
        }
    }
}

/// Feeds every long lived root of the host into one [`Deduplicator`].
pub struct Orchestrator {
    config: DedupConfig,
    registry: Arc<Registry>,
    progress: Box<dyn ProgressSink>,
}

impl Orchestrator {
    /// Fails if the rules for the foundational render types cannot be built.
    pub fn new(config: DedupConfig, capabilities: &Capabilities) -> anyhow::Result<Self> {
        let registry = register_host_rules(capabilities)?;
        debug!("Registered {} deduplication rules", registry.len());

        Ok(Self {
            config,
            registry: Arc::new(registry),
            progress: Box::new(LogProgress::default()),
        })
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Runs the pass, wiping `descriptors` first if configured to. A wiped cache keeps its built-in
    /// descriptors for the host, but the pass only sees an empty view of it.
    pub fn wipe_and_run(
        &mut self,
        resources: &dyn ResourceRegistry,
        descriptors: &mut dyn DescriptorCache,
        statics: &dyn StaticRoots,
        baked: &mut dyn BakedModelTable,
    ) -> DedupSummary {
        if !self.config.wipe_descriptor_cache {
            return self.run(resources, descriptors, statics, baked);
        }

        wipe_descriptor_cache(descriptors);
        self.run(resources, &ModelCache::new(), statics, baked)
    }

    pub fn run(
        &mut self,
        resources: &dyn ResourceRegistry,
        descriptors: &dyn DescriptorCache,
        statics: &dyn StaticRoots,
        baked: &mut dyn BakedModelTable,
    ) -> DedupSummary {
        profiling::scope!("Orchestrator::run");

        if !self.config.deduplicate {
            info!("Deduplication is disabled");
            return DedupSummary::default();
        }

        let mut dedup = Deduplicator::new(self.registry.clone(), self.config.max_recursion);
        let mut roots_visited = 0;

        // Registry keys become the canonical instances, the model files only repeat them.
        for key in resources.block_keys().into_iter().chain(resources.item_keys()) {
            if let Err(err) = dedup.seed(key as Handle) {
                debug!("Cannot seed a resource key: {}", err);
            }
        }

        let descriptor_keys = if self.config.deduplicate_descriptors {
            descriptors.keys()
        } else {
            Vec::new()
        };
        self.progress
            .push("Deduplicating", 2 + descriptor_keys.len());

        self.progress.step("Vertex formats");
        for format in statics.vertex_formats() {
            visit_root(&mut dedup, &mut roots_visited, format as Handle, "vertex format");
        }

        for key in descriptor_keys {
            self.progress.step(&format!("[{}]", key));
            let Some(descriptor) = descriptors.get(&key) else {
                error!("Descriptor {} vanished from the cache", key);
                continue;
            };

            if let Err(err) = dedup.seed(Arc::new(key) as Handle) {
                debug!("Cannot seed a descriptor key: {}", err);
            }
            visit_root(&mut dedup, &mut roots_visited, descriptor.handle(), "descriptor");
        }

        self.progress.step("Statistics");
        for array in statics.stat_arrays() {
            visit_root(&mut dedup, &mut roots_visited, array as Handle, "statistic array");
        }
        for stat in statics.all_stats() {
            visit_root(&mut dedup, &mut roots_visited, stat as Handle, "statistic");
        }

        self.progress.pop();

        if self.config.deduplicate_models {
            self.deduplicate_models(&mut dedup, &mut roots_visited, baked);
        }

        let summary = dedup.summary();
        info!(
            "Deduplicated {} (+ {}) objects.",
            summary.full_replacements, summary.partial_trims
        );

        let per_type = dedup.index().type_stats();
        for (name, stats) in per_type.iter().take(10) {
            debug!(
                "{}: {} replaced, {} trimmed, {} canonical, {} failed",
                name, stats.replaced, stats.trimmed, stats.registered, stats.failures
            );
        }

        DedupSummary {
            full_replacements: summary.full_replacements,
            partial_trims: summary.partial_trims,
            roots_visited,
            failures: summary.failures,
            per_type,
        }
    }

    fn deduplicate_models(&mut self, dedup: &mut Deduplicator, roots_visited: &mut usize, baked: &mut dyn BakedModelTable) {
        let keys = baked.keys();
        let step_every = self.config.step_every.max(1) as usize;
        self.progress
            .push("Deduplicating models", keys.len().div_ceil(step_every));

        for (i, key) in keys.iter().enumerate() {
            if i % step_every == 0 {
                self.progress
                    .step(&format!("{}/{}", i, keys.len()));
            }

            let Some(model) = baked.get(key) else {
                error!("Baked model {} vanished from the registry", key);
                continue;
            };

            let (model, compacted) = match model {
                BakedModel::Multipart(multipart) => {
                    dedup.record_replacement("MultipartBakedModel");
                    let compact = CompactMultipartModel::from(multipart.as_ref());
                    (BakedModel::CompactMultipart(Arc::new(compact)), true)
                }
                model => (model, false),
            };

            profiling::scope!("Deduplicating model");
            *roots_visited += 1;
            let canonical = dedup.deduplicate_root(model.handle());
            match BakedModel::from_handle(canonical) {
                Some(canonical) if compacted || !canonical.same_instance(&model) => baked.put(key.clone(), canonical),
                Some(_) => {}
                None => error!("Deduplicating {} did not yield a baked model", key),
            }
        }

        self.progress.pop();
    }
}

fn visit_root(dedup: &mut Deduplicator, roots_visited: &mut usize, root: Handle, kind: &str) {
    profiling::scope!("Deduplicating root");
    trace!("Deduplicating {}", kind);

    let failures = dedup.index().failures();
    *roots_visited += 1;
    // Static roots are referenced from elsewhere, only their insides are rewritten.
    dedup.deduplicate_root(root);

    if dedup.index().failures() > failures {
        debug!(
            "{} parts of a {} could not be deduplicated",
            dedup.index().failures() - failures,
            kind
        );
    }
}
