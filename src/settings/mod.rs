use clap::{Parser, value_parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "modelfoam")]
#[command(version = concat!(env!("VERGEN_GIT_BRANCH"), "/", env!("VERGEN_GIT_SHA"), " (dirty: ", env!("VERGEN_GIT_DIRTY"), ")"))]
#[command(about = "Deduplicates structurally equal parts of baked render models")]
pub struct CliArgs {
    /// How many edges deep a single root is traversed.
    #[arg(long, env = "MODELFOAM_MAX_RECURSION", default_value_t = 6)]
    pub max_recursion: u32,

    /// Skip deduplication entirely.
    #[arg(long)]
    pub no_deduplicate: bool,

    #[arg(long)]
    pub no_deduplicate_descriptors: bool,

    #[arg(long)]
    pub no_deduplicate_models: bool,

    /// Report progress once every that many baked models.
    #[arg(long, env = "MODELFOAM_STEP_EVERY", default_value_t = 25, value_parser = value_parser!(u32).range(1..))]
    pub step_every: u32,

    /// Write the baked model name and count reports before deduplicating.
    #[arg(long)]
    pub dump_model_counts: bool,

    #[arg(long, env = "MODELFOAM_DUMP_DIR", default_value = ".")]
    pub dump_dir: PathBuf,

    /// Drop all non-builtin descriptors from the cache before deduplicating.
    #[arg(long)]
    pub wipe_descriptor_cache: bool,

    /// Size of the generated demo asset set, in blocks.
    #[arg(long, default_value_t = 256)]
    pub models: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupConfig {
    pub max_recursion: u32,
    pub deduplicate: bool,
    pub deduplicate_descriptors: bool,
    pub deduplicate_models: bool,
    pub step_every: u32,
    pub dump_model_counts: bool,
    pub dump_dir: PathBuf,
    pub wipe_descriptor_cache: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_recursion: 6,
            deduplicate: true,
            deduplicate_descriptors: true,
            deduplicate_models: true,
            step_every: 25,
            dump_model_counts: false,
            dump_dir: PathBuf::from("."),
            wipe_descriptor_cache: false,
        }
    }
}

impl From<&CliArgs> for DedupConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            max_recursion: args.max_recursion,
            deduplicate: !args.no_deduplicate,
            deduplicate_descriptors: !args.no_deduplicate_descriptors,
            deduplicate_models: !args.no_deduplicate_models,
            // The parser already rejects 0, this only guards programmatic construction.
            step_every: args.step_every.max(1),
            dump_model_counts: args.dump_model_counts,
            dump_dir: args.dump_dir.clone(),
            wipe_descriptor_cache: args.wipe_descriptor_cache,
        }
    }
}
