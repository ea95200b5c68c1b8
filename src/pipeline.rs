use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use glam::{DMat4, DVec3};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bounds::{Aabb, Frustum, Obb};
use crate::config::{CameraConfig, CullConfig, Precision};
use crate::error::{CullError, Result};
use crate::ingestion::{self, IngestionResult};
use crate::math::{Matrix4, Real, Vector3};
use crate::octree::{self, HasPosition, LodCamera, Octree, VisibleOctant};

/// Summary of a completed pipeline run.
#[derive(Debug)]
pub struct ProcessingResult {
    pub report: CullReport,
    pub duration: Duration,
}

/// Everything a run computes, serialized as the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct CullReport {
    pub input: String,
    pub format: String,
    pub precision: String,
    pub points: usize,
    pub skipped_points: usize,
    pub aabb: BoundsReport,
    /// Absent when the points do not span a volume.
    pub obb: Option<ObbReport>,
    /// Absent for dry runs.
    pub octree: Option<OctreeReport>,
    pub camera: Option<CameraReport>,
    pub visible: Vec<VisibleOctant>,
    pub visible_points: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoundsReport {
    pub min: DVec3,
    pub max: DVec3,
    pub center: DVec3,
    pub diagonal: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObbReport {
    pub center: DVec3,
    pub size: DVec3,
    /// Box axes in world space, smallest spread first.
    pub axes: [DVec3; 3],
    /// Y-X-Z Euler angles (pitch, yaw, roll) in radians.
    pub euler_rotation: DVec3,
}

#[derive(Debug, Clone, Serialize)]
pub struct OctreeReport {
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
    pub max_points_per_octant: usize,
    pub max_depth: u8,
    pub grid_cells: u32,
    /// Point spacing kept on the root octant.
    pub root_spacing: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraReport {
    pub position: DVec3,
    pub target: DVec3,
    pub fov_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    /// Near plane corners first, then far plane.
    pub frustum_corners: Vec<DVec3>,
}

/// Pipeline orchestrator -- drives ingestion, fitting, octree build and culling.
pub struct Pipeline;

impl Pipeline {
    /// Run the full pipeline and write the report (unless dry-running).
    pub fn run(config: &CullConfig) -> Result<ProcessingResult> {
        let start = Instant::now();

        info!(input = %config.input.display(), precision = %config.precision, "Starting pipeline");

        info!("Stage 1/4: Ingestion");
        let ingestion_result = ingestion::ingest(config)?;

        let report = match config.precision {
            Precision::Single => Self::process::<f32>(config, &ingestion_result)?,
            Precision::Double => Self::process::<f64>(config, &ingestion_result)?,
        };

        if config.dry_run {
            print_dry_run_summary(&report);
        } else {
            write_report(&report, config.output.as_deref())?;
        }

        let duration = start.elapsed();
        info!(
            visible = report.visible.len(),
            visible_points = report.visible_points,
            elapsed = ?duration,
            "Pipeline complete"
        );

        Ok(ProcessingResult { report, duration })
    }

    fn process<R>(config: &CullConfig, ingestion_result: &IngestionResult) -> Result<CullReport>
    where
        R: Real,
        R::Vec3: HasPosition<R>,
    {
        let points: Vec<R::Vec3> = ingestion_result.points.iter().map(|p| to_real::<R>(*p)).collect();

        info!("Stage 2/4: Bounding volumes");
        let aabb = Aabb::<R>::from_points(&points)?;
        let obb = match Obb::<R>::fit(&points) {
            Ok(obb) => Some(obb),
            Err(CullError::IllConditioned(reason)) => {
                warn!(%reason, "Skipping oriented box");
                None
            }
            Err(e) => return Err(e),
        };
        let aabb_report = bounds_report(&aabb);
        debug!(min = ?aabb_report.min, max = ?aabb_report.max, "Axis-aligned bounds");

        let mut report = CullReport {
            input: config.input.display().to_string(),
            format: ingestion_result.stats.input_format.clone(),
            precision: config.precision.to_string(),
            points: ingestion_result.stats.point_count,
            skipped_points: ingestion_result.stats.skipped_points,
            aabb: aabb_report,
            obb: obb.as_ref().map(obb_report),
            octree: None,
            camera: None,
            visible: Vec::new(),
            visible_points: 0,
        };

        if config.dry_run {
            return Ok(report);
        }

        info!("Stage 3/4: Octree");
        let tree = Octree::<R, R::Vec3>::build_with_grid(
            points,
            config.octree.max_points_per_octant,
            config.octree.max_depth,
            config.octree.grid_cells,
        )?;
        info!(
            nodes = tree.node_count(),
            leaves = tree.leaf_count(),
            depth = tree.depth(),
            "Octree built"
        );

        info!("Stage 4/4: Culling");
        let (eye, target) = resolve_camera(&config.camera, &report.aabb);
        let view_proj = camera_matrix(&config.camera, eye, target)?;
        let matrix = R::Mat4::from_cols_array(view_proj.to_cols_array().map(R::from_f64));
        let frustum = Frustum::<R>::from_matrix(&matrix);
        let corners = Frustum::<R>::corners(&matrix)?;

        let camera = LodCamera::<R> {
            position: to_real::<R>(eye),
            screen_height: R::from_f64(config.camera.screen_height),
            fov: R::from_f64(config.camera.fov_deg.to_radians()),
        };
        let visible = octree::cull(&tree, &frustum, &camera, R::from_f64(config.camera.min_screen_size));

        report.visible_points = visible.iter().map(|v| v.point_count).sum();
        report.visible = visible;
        report.octree = Some(OctreeReport {
            nodes: tree.node_count(),
            leaves: tree.leaf_count(),
            depth: tree.depth(),
            max_points_per_octant: config.octree.max_points_per_octant,
            max_depth: config.octree.max_depth,
            grid_cells: tree.grid_cells(),
            root_spacing: tree.spacing(tree.root()).to_f64(),
        });
        report.camera = Some(CameraReport {
            position: eye,
            target,
            fov_deg: config.camera.fov_deg,
            aspect: config.camera.aspect,
            near: config.camera.near,
            far: config.camera.far,
            frustum_corners: corners.iter().map(to_f64::<R>).collect(),
        });

        Ok(report)
    }
}

fn to_real<R: Real>(v: DVec3) -> R::Vec3 {
    R::Vec3::from_array(v.to_array().map(R::from_f64))
}

fn to_f64<R: Real>(v: R::Vec3) -> DVec3 {
    DVec3::from_array(v.to_array().map(R::to_f64))
}

fn bounds_report<R: Real>(aabb: &Aabb<R>) -> BoundsReport {
    BoundsReport {
        min: to_f64::<R>(aabb.min),
        max: to_f64::<R>(aabb.max),
        center: to_f64::<R>(aabb.center()),
        diagonal: aabb.diagonal().to_f64(),
    }
}

fn obb_report<R: Real>(obb: &Obb<R>) -> ObbReport {
    ObbReport {
        center: to_f64::<R>(obb.center()),
        size: to_f64::<R>(obb.size),
        axes: obb.axes().map(to_f64::<R>),
        euler_rotation: to_f64::<R>(obb.euler_rotation()),
    }
}

/// Eye and target for the run: configured values, or a view of the whole
/// cloud from +z at twice the diagonal.
pub fn resolve_camera(camera: &CameraConfig, bounds: &BoundsReport) -> (DVec3, DVec3) {
    let target = camera.target.map(DVec3::from_array).unwrap_or(bounds.center);
    let eye = camera.position.map(DVec3::from_array).unwrap_or_else(|| {
        let distance = if bounds.diagonal > 0.0 { 2.0 * bounds.diagonal } else { 1.0 };
        bounds.center + DVec3::Z * distance
    });
    (eye, target)
}

/// OpenGL-style view-projection matrix for the configured camera.
pub fn camera_matrix(camera: &CameraConfig, eye: DVec3, target: DVec3) -> Result<DMat4> {
    if !(camera.fov_deg > 0.0 && camera.fov_deg < 180.0) {
        return Err(CullError::Input(format!(
            "field of view must be in (0, 180) degrees, got {}",
            camera.fov_deg
        )));
    }
    if !(camera.aspect > 0.0) {
        return Err(CullError::Input(format!("aspect must be positive, got {}", camera.aspect)));
    }
    if !(camera.near > 0.0 && camera.far > camera.near) {
        return Err(CullError::Input(format!(
            "clip range must satisfy 0 < near < far, got near {} far {}",
            camera.near, camera.far
        )));
    }
    let forward = target - eye;
    if forward.length_squared() == 0.0 || !forward.is_finite() {
        return Err(CullError::Input("camera position and target coincide".into()));
    }
    let up = if forward.normalize().cross(DVec3::Y).length_squared() < 1e-12 {
        DVec3::Z
    } else {
        DVec3::Y
    };

    let view = DMat4::look_at_rh(eye, target, up);
    let proj = DMat4::perspective_rh_gl(camera.fov_deg.to_radians(), camera.aspect, camera.near, camera.far);
    Ok(proj * view)
}

/// Serialize the report as pretty JSON to `output`, or stdout.
pub fn write_report(report: &CullReport, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(path).map_err(|e| {
                CullError::Output(format!("Failed to create {}: {e}", path.display()))
            })?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, report)
                .map_err(|e| CullError::Output(format!("Failed to write report: {e}")))?;
            writer.flush()?;
            info!(output = %path.display(), "Report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, report)
                .map_err(|e| CullError::Output(format!("Failed to write report: {e}")))?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

/// Print dry-run summary with point stats and fitted bounds.
fn print_dry_run_summary(report: &CullReport) {
    let bb = &report.aabb;
    println!("=== Dry Run Summary ===");
    println!("  Format:    {}", report.format);
    println!("  Precision: {}", report.precision);
    println!("  Points:    {}", report.points);
    println!("  Skipped:   {}", report.skipped_points);
    println!(
        "  AABB:      ({:.3}, {:.3}, {:.3}) → ({:.3}, {:.3}, {:.3})",
        bb.min.x, bb.min.y, bb.min.z, bb.max.x, bb.max.y, bb.max.z
    );
    println!("  Diagonal:  {:.3}", bb.diagonal);
    match &report.obb {
        Some(obb) => {
            println!(
                "  OBB size:  ({:.3}, {:.3}, {:.3})",
                obb.size.x, obb.size.y, obb.size.z
            );
            println!(
                "  OBB euler: ({:.1}°, {:.1}°, {:.1}°)",
                obb.euler_rotation.x.to_degrees(),
                obb.euler_rotation.y.to_degrees(),
                obb.euler_rotation.z.to_degrees()
            );
        }
        None => println!("  OBB:       degenerate point set"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{Builder, TempDir};

    fn bounds(center: DVec3, diagonal: f64) -> BoundsReport {
        BoundsReport {
            min: center,
            max: center,
            center,
            diagonal,
        }
    }

    fn write_cube_xyz(n: usize) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".xyz").tempfile().unwrap();
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    writeln!(file, "{x} {} {}", y * 2, z * 3).unwrap();
                }
            }
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn default_camera_looks_at_center_from_z() {
        let b = bounds(DVec3::new(1.0, 2.0, 3.0), 5.0);
        let (eye, target) = resolve_camera(&CameraConfig::default(), &b);
        assert_eq!(target, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(eye, DVec3::new(1.0, 2.0, 13.0));
    }

    #[test]
    fn configured_camera_wins() {
        let camera = CameraConfig {
            position: Some([0.0, 10.0, 0.0]),
            target: Some([1.0, 1.0, 1.0]),
            ..Default::default()
        };
        let (eye, target) = resolve_camera(&camera, &bounds(DVec3::ZERO, 1.0));
        assert_eq!(eye, DVec3::new(0.0, 10.0, 0.0));
        assert_eq!(target, DVec3::ONE);
    }

    #[test]
    fn camera_matrix_sees_target() {
        let camera = CameraConfig::default();
        let m = camera_matrix(&camera, DVec3::new(0.0, 0.0, 10.0), DVec3::ZERO).unwrap();
        let frustum = Frustum::<f64>::from_matrix(&m);
        assert!(frustum.contains_point(DVec3::ZERO));
    }

    #[test]
    fn camera_matrix_looking_down_y() {
        let camera = CameraConfig::default();
        let m = camera_matrix(&camera, DVec3::new(0.0, 10.0, 0.0), DVec3::ZERO).unwrap();
        assert!(m.is_finite());
        assert!(Frustum::<f64>::from_matrix(&m).contains_point(DVec3::ZERO));
    }

    #[test]
    fn camera_matrix_rejects_bad_parameters() {
        let eye = DVec3::new(0.0, 0.0, 10.0);
        let bad = [
            CameraConfig { fov_deg: 0.0, ..Default::default() },
            CameraConfig { fov_deg: 180.0, ..Default::default() },
            CameraConfig { aspect: -1.0, ..Default::default() },
            CameraConfig { near: 0.0, ..Default::default() },
            CameraConfig { near: 10.0, far: 5.0, ..Default::default() },
        ];
        for camera in bad {
            assert!(matches!(camera_matrix(&camera, eye, DVec3::ZERO), Err(CullError::Input(_))));
        }
        assert!(camera_matrix(&CameraConfig::default(), eye, eye).is_err());
    }

    #[test]
    fn run_writes_report() {
        let input = write_cube_xyz(6);
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("nested").join("report.json");
        let config = CullConfig {
            input: input.path().to_path_buf(),
            output: Some(output.clone()),
            ..Default::default()
        };

        let result = Pipeline::run(&config).unwrap();
        let report = &result.report;
        assert_eq!(report.points, 216);
        assert_eq!(report.aabb.max, DVec3::new(5.0, 10.0, 15.0));
        assert_eq!(report.visible_points, 216);
        assert!(report.octree.is_some());
        assert_eq!(report.camera.as_ref().map(|c| c.frustum_corners.len()), Some(8));

        let obb = report.obb.as_ref().unwrap();
        assert!((obb.size.max_element() - 15.0).abs() < 1e-9);

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["points"], 216);
        assert_eq!(json["visible"][0]["id"], "r");
    }

    #[test]
    fn dry_run_skips_octree() {
        let input = write_cube_xyz(3);
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("report.json");
        let config = CullConfig {
            input: input.path().to_path_buf(),
            output: Some(output.clone()),
            dry_run: true,
            ..Default::default()
        };

        let result = Pipeline::run(&config).unwrap();
        assert!(result.report.octree.is_none());
        assert!(result.report.visible.is_empty());
        assert!(result.report.obb.is_some());
        assert!(!output.exists());
    }

    #[test]
    fn single_precision_matches_double() {
        let input = write_cube_xyz(4);
        let base = CullConfig {
            input: input.path().to_path_buf(),
            dry_run: true,
            ..Default::default()
        };
        let single = CullConfig {
            precision: Precision::Single,
            ..base.clone()
        };
        let d = Pipeline::run(&base).unwrap().report;
        let s = Pipeline::run(&single).unwrap().report;
        assert_eq!(s.precision, "f32");
        assert!(s.aabb.max.abs_diff_eq(d.aabb.max, 1e-6));
        let (so, dob) = (s.obb.unwrap(), d.obb.unwrap());
        assert!(so.size.abs_diff_eq(dob.size, 1e-3));
    }

    #[test]
    fn single_point_has_no_obb() {
        let mut file = Builder::new().suffix(".xyz").tempfile().unwrap();
        writeln!(file, "1 2 3").unwrap();
        file.flush().unwrap();
        let config = CullConfig {
            input: file.path().to_path_buf(),
            dry_run: true,
            ..Default::default()
        };
        let report = Pipeline::run(&config).unwrap().report;
        assert!(report.obb.is_none());
        assert_eq!(report.aabb.diagonal, 0.0);
    }
}
