//! Assemble a session and print the timeline without writing a project.

use std::path::PathBuf;

use recast_common::config::AssemblyConfig;
use recast_processing_core::geometry::CanvasLayout;
use recast_project_model::composition::Composition;
use recast_project_model::time::format_ns;
use recast_render_engine::export::assemble_session;
use recast_render_engine::probe::FfprobeProbe;

pub fn run(
    session: PathBuf,
    config: AssemblyConfig,
    json: bool,
    work_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let probe = FfprobeProbe::new();
    if !probe.is_available() {
        anyhow::bail!("ffprobe not found in PATH");
    }

    tracing::debug!(config = ?config, "Resolved assembly configuration");
    let layout = CanvasLayout::from_config(&config);

    let work_dir = work_dir.unwrap_or_else(|| session.clone());
    let composition = assemble_session(&session, &config, &work_dir, &probe)
        .map_err(|e| anyhow::anyhow!("Assembly failed: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&composition)?);
    } else {
        print_plan(&composition, &layout);
    }
    Ok(())
}

fn print_plan(composition: &Composition, layout: &CanvasLayout) {
    println!(
        "Composition: {}",
        composition.name.as_deref().unwrap_or("(unnamed)")
    );
    println!("  Canvas: {}x{}", composition.width, composition.height);
    println!(
        "  Slides region: {}x{} at x={}",
        layout.slides_region.width, layout.slides_region.height, layout.slides_region.x
    );
    println!(
        "  Camera column: {}x{} at x={}",
        layout.camera_column.width, layout.camera_column.height, layout.camera_column.x
    );
    if let Some(rate) = composition.framerate {
        println!("  Frame rate: {}/{}", rate.num, rate.den);
    }
    println!("  Duration: {}", format_ns(composition.duration));
    println!("  Assets: {}", composition.assets.len());

    for layer in &composition.layers {
        println!();
        println!("{} ({} clips)", layer.name(), layer.clips.len());
        for clip in &layer.clips {
            let asset = composition
                .asset(clip.asset)
                .map(|a| a.path.display().to_string())
                .unwrap_or_else(|| clip.asset.to_string());
            println!(
                "  {} +{} in={}  {}x{} at ({}, {})  {}",
                format_ns(clip.start),
                format_ns(clip.duration),
                format_ns(clip.inpoint),
                clip.rect.width,
                clip.rect.height,
                clip.rect.x,
                clip.rect.y,
                asset
            );
        }
    }
}
