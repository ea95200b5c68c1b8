use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use glam::DVec3;
use tracing::debug;

use crate::error::{CullError, Result};

/// Load a whitespace separated XYZ file.
///
/// The first three columns of each row are x, y, z; further columns
/// (intensity, color, ...) are ignored. Blank lines and lines starting with
/// `#` or `//` are skipped. Commas count as separators too.
pub fn load_xyz(path: &Path) -> Result<Vec<DVec3>> {
    let file = File::open(path)
        .map_err(|e| CullError::Input(format!("Failed to open XYZ: {e}")))?;
    let points = parse_xyz(BufReader::new(file))?;
    debug!(point_count = points.len(), "Parsed XYZ points");
    Ok(points)
}

/// Parse XYZ rows from any reader.
pub fn parse_xyz<R: BufRead>(reader: R) -> Result<Vec<DVec3>> {
    let mut points = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let row = line.trim();
        if row.is_empty() || row.starts_with('#') || row.starts_with("//") {
            continue;
        }

        let mut cols = row
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|c| !c.is_empty());
        let mut coord = [0.0; 3];
        for (axis, slot) in coord.iter_mut().enumerate() {
            let col = cols.next().ok_or_else(|| {
                CullError::Input(format!(
                    "XYZ line {}: expected 3 coordinates, found {axis}",
                    idx + 1
                ))
            })?;
            *slot = col.parse::<f64>().map_err(|e| {
                CullError::Input(format!("XYZ line {}: invalid number '{col}': {e}", idx + 1))
            })?;
        }
        points.push(DVec3::from_array(coord));
    }
    Ok(points)
}
