use std::path::PathBuf;

use clap::Parser;

use crate::octree::DEFAULT_GRID_CELLS;

/// Floating point precision used for fitting and culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Precision {
    #[value(name = "f32")]
    Single,
    #[default]
    #[value(name = "f64")]
    Double,
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precision::Single => write!(f, "f32"),
            Precision::Double => write!(f, "f64"),
        }
    }
}

/// Perspective camera and level of detail parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// Eye position; derived from the data bounds when absent.
    pub position: Option<[f64; 3]>,
    /// Look-at target; the data center when absent.
    pub target: Option<[f64; 3]>,
    /// Vertical field of view in degrees.
    pub fov_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub screen_height: f64,
    /// Nodes projecting to fewer pixels are culled.
    pub min_screen_size: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: None,
            target: None,
            fov_deg: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 10_000.0,
            screen_height: 1080.0,
            min_screen_size: 0.0,
        }
    }
}

/// Octree construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct OctreeConfig {
    pub max_points_per_octant: usize,
    pub max_depth: u8,
    /// Spacing-grid cells per axis of every octant.
    pub grid_cells: u32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_points_per_octant: 4096,
            max_depth: 8,
            grid_cells: DEFAULT_GRID_CELLS,
        }
    }
}

/// Fully resolved run configuration (constructed from CLI args).
#[derive(Debug, Clone, PartialEq)]
pub struct CullConfig {
    pub input: PathBuf,
    /// Report destination; stdout when absent.
    pub output: Option<PathBuf>,
    pub precision: Precision,
    pub camera: CameraConfig,
    pub octree: OctreeConfig,
    pub dry_run: bool,
    pub verbose: bool,
    pub log_json: bool,
    pub threads: Option<usize>,
}

impl Default for CullConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: None,
            precision: Precision::default(),
            camera: CameraConfig::default(),
            octree: OctreeConfig::default(),
            dry_run: false,
            verbose: false,
            log_json: false,
            threads: None,
        }
    }
}

/// Parse `x,y,z` into three coordinates.
fn parse_vec3(s: &str) -> std::result::Result<[f64; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z but got '{s}'"));
    };
    let parse = |v: &str| {
        v.parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{v}': {e}"))
    };
    Ok([parse(*x)?, parse(*y)?, parse(*z)?])
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "octree-cull",
    about = "Fit bounding volumes to a point cloud, build an octree and frustum-cull it",
    version
)]
pub struct CliArgs {
    /// Input point cloud (XYZ, PLY)
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Write the JSON report here instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Arithmetic precision for fitting and culling
    #[arg(long, value_enum, default_value = "f64")]
    pub precision: Precision,

    /// Camera position as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub camera: Option<[f64; 3]>,

    /// Look-at target as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub target: Option<[f64; 3]>,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 60.0)]
    pub fov: f64,

    /// Viewport aspect ratio (width / height)
    #[arg(long, default_value_t = 16.0 / 9.0)]
    pub aspect: f64,

    /// Near clip distance
    #[arg(long, default_value_t = 0.1)]
    pub near: f64,

    /// Far clip distance
    #[arg(long, default_value_t = 10_000.0)]
    pub far: f64,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 1080.0)]
    pub screen_height: f64,

    /// Octants holding more points than this are subdivided
    #[arg(long, default_value_t = 4096)]
    pub max_points: usize,

    /// Max octree depth
    #[arg(long, default_value_t = 8)]
    pub max_depth: u8,

    /// Level-of-detail grid cells per octant axis
    #[arg(long, default_value_t = DEFAULT_GRID_CELLS)]
    pub grid_cells: u32,

    /// Cull octants smaller than this many pixels
    #[arg(long, default_value_t = 0.0)]
    pub min_screen_size: f64,

    /// Fit bounds and report stats only
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl From<CliArgs> for CullConfig {
    fn from(args: CliArgs) -> Self {
        CullConfig {
            input: args.input,
            output: args.output,
            precision: args.precision,
            camera: CameraConfig {
                position: args.camera,
                target: args.target,
                fov_deg: args.fov,
                aspect: args.aspect,
                near: args.near,
                far: args.far,
                screen_height: args.screen_height,
                min_screen_size: args.min_screen_size,
            },
            octree: OctreeConfig {
                max_points_per_octant: args.max_points,
                max_depth: args.max_depth,
                grid_cells: args.grid_cells,
            },
            dry_run: args.dry_run,
            verbose: args.verbose,
            log_json: args.log_json,
            threads: args.threads,
        }
    }
}
