use clap::Parser;
use log::info;
use modelfoam::demo::DemoAssets;
use modelfoam::rendering::dedup::capabilities::host_capabilities;
use modelfoam::rendering::dedup::diagnostics::ModelCountReport;
use modelfoam::rendering::dedup::orchestrator::Orchestrator;
use modelfoam::rendering::dedup::registries::BakedModelTable;
use modelfoam::settings::{CliArgs, DedupConfig};
use modelfoam::util::weak_dashmap::SlotTracker;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    #[cfg(feature = "tracy")]
    let _tracy = tracy_client::Client::start();

    let args = CliArgs::parse();
    log::trace!("Starting with args: {:?}", args);
    let config = DedupConfig::from(&args);

    let capabilities = host_capabilities();
    let tracker = SlotTracker::new();
    let mut assets = DemoAssets::generate(args.models, &capabilities, &tracker)?;

    if config.dump_model_counts {
        ModelCountReport::collect(&assets.baked.keys()).write_to(&config.dump_dir)?;
    }

    let mut orchestrator = Orchestrator::new(config, &capabilities)?;
    let summary = orchestrator.wipe_and_run(
        &assets.resources,
        &mut assets.descriptors,
        &assets.statics,
        &mut assets.baked,
    );
    info!(
        "Visited {} roots, {} parts could not be deduplicated",
        summary.roots_visited, summary.failures
    );

    // Render every model once, then simulate memory pressure and render again.
    let quads = render_all(&assets);
    let reclaimed = tracker.reclaim_all();
    let rerendered = render_all(&assets);
    info!(
        "Rendered {} quads, reclaimed {} lazily baked quad lists, rendered {} quads again",
        quads, reclaimed, rerendered
    );

    Ok(())
}

fn render_all(assets: &DemoAssets) -> usize {
    profiling::scope!("render_all");
    assets
        .baked
        .iter()
        .map(|(_, model)| model.quads("north=true", None).len())
        .sum()
}
