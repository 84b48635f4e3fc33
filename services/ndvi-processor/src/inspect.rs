//! `analyze` and `state` subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use pipeline_state::{ArtifactMeta, PipelineState};
use swath_catalog::{list_swath_directories, GeolocPreference};

/// Print the filesets found in every swath directory.
pub fn analyze(data_dir: &Path, preference: GeolocPreference, show_bands: bool) -> Result<()> {
    let directories = list_swath_directories(data_dir)
        .with_context(|| format!("Failed to list swath directories in {:?}", data_dir))?;

    for dir in &directories {
        let filesets = dir.filesets(preference);
        println!("{} (swath {}, {} filesets)", dir.name, dir.swath_id, filesets.len());
        if let Some(mask) = dir.cloud_mask_source() {
            println!("  cloud mask: {}", mask.display());
        }

        for fileset in &filesets {
            let geoloc = &fileset.geoloc;
            let marker = if fileset.is_complete() { "" } else { " (incomplete)" };
            println!(
                "  {} {} [{}] orbit {} {} {}-{} sat {} bands {}{}",
                geoloc.record_type,
                geoloc.name,
                fileset.resolution().short_name(),
                geoloc.orbit,
                geoloc.date,
                geoloc.t_start.format("%H:%M:%S"),
                geoloc.t_end.format("%H:%M:%S"),
                geoloc.sat_id,
                fileset.bands.len(),
                marker
            );
            if show_bands {
                for band in &fileset.bands {
                    println!("    {} {}", band.record_type, band.name);
                }
            }
        }
    }
    println!("{} swath directories", directories.len());
    Ok(())
}

fn mark(meta: &ArtifactMeta) -> &'static str {
    if meta.exists() {
        ""
    } else {
        "(BROKEN) "
    }
}

/// Print every persisted record, flagging those whose file is gone.
pub async fn print_state(state: &PipelineState) -> Result<()> {
    let rasters = state.swath_rasters().await?;
    println!("Swath rasters ({})", rasters.len());
    for r in &rasters {
        println!(
            "  {}{} <- {} [{}] {}",
            mark(&r.meta),
            r.meta.output_path.display(),
            r.source,
            r.record_type,
            r.acquired_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let masks = state.cloud_masks().await?;
    println!("Cloud masks ({})", masks.len());
    for r in &masks {
        println!(
            "  {}{} <- {}",
            mark(&r.meta),
            r.meta.output_path.display(),
            r.source_path.display()
        );
    }

    let ndvi = state.ndvi_records().await?;
    println!("NDVI ({})", ndvi.len());
    for r in &ndvi {
        println!(
            "  {}{} <- {} {}",
            mark(&r.meta),
            r.meta.output_path.display(),
            r.based_on,
            r.acquired_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let composites = state.composites().await?;
    println!("Composites ({})", composites.len());
    for r in &composites {
        println!(
            "  {}{} {} ({})",
            mark(&r.meta),
            r.meta.output_path.display(),
            r.period,
            r.period.date_text()
        );
        for component in &r.components {
            let broken = if component.exists() { "" } else { "(BROKEN) " };
            println!("    {}{}", broken, component.display());
        }
    }

    let dynamics = state.dynamics_records().await?;
    println!("Dynamics ({})", dynamics.len());
    for r in &dynamics {
        let gap = r
            .gap_days
            .map(|d| format!(" gap {} days", d))
            .unwrap_or_default();
        println!(
            "  {}{}{}\n    b1 {}\n    b2 {}",
            mark(&r.meta),
            r.meta.output_path.display(),
            gap,
            r.b1.display(),
            r.b2.display()
        );
    }

    let pending = state.pending_directories().await?;
    println!("Pending directories ({})", pending.len());
    for dir in &pending {
        println!("  {}", dir);
    }

    match state.last_check_time().await? {
        Some(at) => println!("Last check: {}", at.to_rfc3339()),
        None => println!("Last check: never"),
    }
    Ok(())
}
