pub mod ply_loader;
pub mod xyz_loader;

use std::path::Path;

use glam::DVec3;
use tracing::{debug, info, warn};

use crate::config::CullConfig;
use crate::error::{CullError, Result};

/// Result of the ingestion stage.
#[derive(Debug)]
pub struct IngestionResult {
    pub points: Vec<DVec3>,
    pub stats: IngestionStats,
}

/// Statistics about the ingested data.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionStats {
    pub point_count: usize,
    /// Points dropped for non-finite coordinates.
    pub skipped_points: usize,
    pub input_format: String,
}

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Xyz,
    Ply,
}

impl InputFormat {
    /// Detect format from file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xyz" | "txt" | "pts" => Ok(InputFormat::Xyz),
            "ply" => Ok(InputFormat::Ply),
            _ => Err(CullError::Input(format!("Unsupported file format: .{ext}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Xyz => "XYZ",
            InputFormat::Ply => "PLY",
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run the full ingestion stage.
pub fn ingest(config: &CullConfig) -> Result<IngestionResult> {
    if !config.input.exists() {
        return Err(CullError::Input(format!(
            "Input file not found: {}",
            config.input.display()
        )));
    }

    let format = InputFormat::from_path(&config.input)?;
    info!(format = %format, path = %config.input.display(), "Detected input format");

    let raw = match format {
        InputFormat::Xyz => xyz_loader::load_xyz(&config.input)?,
        InputFormat::Ply => ply_loader::load_ply(&config.input)?,
    };

    let (points, skipped_points) = drop_non_finite(raw);
    if skipped_points > 0 {
        warn!(skipped = skipped_points, "Dropped points with non-finite coordinates");
    }
    if points.is_empty() {
        return Err(CullError::Input(format!(
            "No usable points in {}",
            config.input.display()
        )));
    }

    let stats = IngestionStats {
        point_count: points.len(),
        skipped_points,
        input_format: format.to_string(),
    };
    debug!(points = stats.point_count, skipped = stats.skipped_points, "Ingestion stats");

    Ok(IngestionResult { points, stats })
}

/// Keep finite points; returns them with the number dropped.
pub fn drop_non_finite(mut points: Vec<DVec3>) -> (Vec<DVec3>, usize) {
    let before = points.len();
    points.retain(|p| p.is_finite());
    let skipped = before - points.len();
    (points, skipped)
}
