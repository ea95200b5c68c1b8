use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::DVec3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use tracing::debug;

use crate::error::{CullError, Result};

/// Load the `vertex` positions of a PLY file (ASCII or binary).
///
/// Faces and other elements are ignored.
pub fn load_ply(path: &Path) -> Result<Vec<DVec3>> {
    let file = File::open(path)
        .map_err(|e| CullError::Input(format!("Failed to open PLY: {e}")))?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| CullError::Input(format!("Failed to parse PLY: {e}")))?;

    let vertices = ply
        .payload
        .get("vertex")
        .ok_or_else(|| CullError::Input("PLY file missing 'vertex' element".into()))?;

    debug!(vertex_count = vertices.len(), "Parsing PLY vertices");

    vertices
        .iter()
        .map(|vertex| {
            Ok(DVec3::new(
                get_float_property(vertex, "x")?,
                get_float_property(vertex, "y")?,
                get_float_property(vertex, "z")?,
            ))
        })
        .collect()
}

/// Extract a scalar property as f64, whatever its stored numeric type.
fn get_float_property(element: &DefaultElement, key: &str) -> Result<f64> {
    let prop = element
        .get(key)
        .ok_or_else(|| CullError::Input(format!("PLY vertex missing property '{key}'")))?;

    match prop {
        Property::Double(v) => Ok(*v),
        Property::Float(v) => Ok(f64::from(*v)),
        Property::Int(v) => Ok(f64::from(*v)),
        Property::UInt(v) => Ok(f64::from(*v)),
        Property::Short(v) => Ok(f64::from(*v)),
        Property::UShort(v) => Ok(f64::from(*v)),
        Property::Char(v) => Ok(f64::from(*v)),
        Property::UChar(v) => Ok(f64::from(*v)),
        _ => Err(CullError::Input(format!(
            "PLY property '{key}' has unsupported type"
        ))),
    }
}
