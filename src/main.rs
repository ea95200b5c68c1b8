use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use octree_cull::config::{CliArgs, CullConfig};
use octree_cull::pipeline::Pipeline;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Init tracing; logs go to stderr so the report can use stdout
    let filter = if args.verbose {
        EnvFilter::new("octree_cull=debug")
    } else {
        EnvFilter::new("octree_cull=info")
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config: CullConfig = args.into();

    // Configure rayon thread pool
    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure rayon thread pool")?;
    }

    match Pipeline::run(&config) {
        Ok(result) => {
            eprintln!(
                "Done: {} of {} points visible in {} octants ({:.2}s)",
                result.report.visible_points,
                result.report.points,
                result.report.visible.len(),
                result.duration.as_secs_f64()
            );
            Ok(())
        }
        Err(e) => {
            error!(%e, "Pipeline failed");
            Err(anyhow::anyhow!(e)).context("octree-cull pipeline failed")
        }
    }
}
