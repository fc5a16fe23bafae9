//! Export a session to a GES project.

use std::path::PathBuf;

use recast_common::config::AssemblyConfig;
use recast_render_engine::export::{export_session, ExportJob};

pub async fn run(
    session: PathBuf,
    output: PathBuf,
    config: AssemblyConfig,
    work_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("Exporting session at: {}", session.display());
    println!("  Output: {}", output.display());
    println!("  Resolution: {}x{}", config.width, config.height);
    if config.start_secs > 0.0 || config.end_secs.is_some() {
        match config.end_secs {
            Some(end) => println!("  Window: {:.3}s - {end:.3}s", config.start_secs),
            None => println!("  Window: {:.3}s - end", config.start_secs),
        }
    }

    tracing::debug!(config = ?config, "Resolved assembly configuration");

    let job = ExportJob {
        work_dir,
        ..ExportJob::new(session, output, config)
    };

    let written = export_session(job)
        .await
        .map_err(|e| anyhow::anyhow!("Export failed: {e}"))?;

    println!("\nExport complete: {}", written.display());
    Ok(())
}
