//! Runs the whole cell pipeline on a synthetic scene:
//! split, export, fake per-cell training output, merge.
//!
//! ```sh
//! cargo run -p cellsplat-app --example synthetic_pipeline
//! ```

use std::error::Error;

use cellsplat_data::{
    Camera, CellTable, GroundPlane, Observation, Point3D, Scene, Splat, load_scene, load_splats,
    save_scene, save_splats,
};
use cellsplat_merge::AssetMerger;
use cellsplat_split::{CellExporter, ScenePartitioner, SplitConfig};
use glam::{DQuat, DVec2, DVec3, Vec3};
use tracing::info;

const SIDE: u32 = 40;

/// A flat 40x40 lattice of points on the XZ plane with one camera per
/// 10x10 patch, each camera observing its own patch.
fn synthetic_scene() -> Scene {
    let mut scene = Scene::default();

    for patch_z in 0..SIDE / 10 {
        for patch_x in 0..SIDE / 10 {
            let id = patch_z * (SIDE / 10) + patch_x + 1;
            let center = DVec3::new(patch_x as f64 * 10.0 + 5.0, 3.0, patch_z as f64 * 10.0 + 5.0);
            scene.cameras.insert(
                id,
                Camera::new(DQuat::IDENTITY, center, 1, format!("frame_{id:04}.jpg")),
            );
        }
    }

    for z in 0..SIDE {
        for x in 0..SIDE {
            let point_id = (z * SIDE + x) as u64;
            let cam = (z / 10) * (SIDE / 10) + x / 10 + 1;
            let height = ((x as f64) * 0.3).sin() * 0.5;
            let point = Point3D::new(
                DVec3::new(x as f64, height, z as f64),
                [(x * 6) as u8, 128, (z * 6) as u8],
                0.4,
            );
            let Some(camera) = scene.cameras.get_mut(&cam) else {
                continue;
            };
            let idx = camera.observations.len() as u32;
            camera.observations.push(Observation::new(
                DVec2::new(x as f64 * 16.0, z as f64 * 16.0),
                point_id as i64,
            ));
            scene.points.insert(point_id, point.with_observation(cam, idx));
        }
    }

    scene
}

/// Stand-in for per-cell training: one splat per point, plus a ring of
/// splats that drift past the cell's border.
fn fake_training(scene: &Scene) -> Vec<Splat> {
    let mut splats: Vec<Splat> = scene
        .points
        .values()
        .map(|p| {
            let mut s = Splat::at(p.position.as_vec3());
            s.color_dc = p.color.map(|c| c as f32 / 255.0);
            s.opacity = 1.0;
            s.scale = [-3.0; 3];
            s
        })
        .collect();

    let drift: Vec<Splat> = splats
        .iter()
        .map(|s| Splat::at(s.position() + Vec3::new(7.5, 0.0, -7.5)))
        .collect();
    splats.extend(drift);
    splats
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let work = tempfile::tempdir()?;
    let scene_dir = work.path().join("scene");
    let cells_dir = work.path().join("cells");
    let assets_dir = work.path().join("assets");

    save_scene(&scene_dir, &synthetic_scene())?;
    let scene = load_scene(&scene_dir)?;

    let config = SplitConfig::default().with_grid(2, 2);
    let partition = ScenePartitioner::new(config)?.partition(&scene)?;
    let exporter = CellExporter::new(&cells_dir);
    exporter.export(&partition)?;

    for cell in &partition.cells {
        let cell_scene = load_scene(exporter.cell_dir(cell.pos))?;
        save_splats(
            assets_dir.join(format!("{}.ply", cell.pos)),
            &fake_training(&cell_scene),
        )?;
    }

    let table = CellTable::load(exporter.table_path())?;
    let output = AssetMerger::new(table, GroundPlane::XZ).merge_dir(&assets_dir, "ply")?;
    let merged_path = work.path().join("merged.ply");
    save_splats(&merged_path, &output.splats)?;

    let reloaded = load_splats(&merged_path)?;
    info!(
        "Pipeline done: {} points -> {} cells -> {} splats ({} culled at seams)",
        scene.points.len(),
        partition.cells.len(),
        reloaded.len(),
        output.report.culled()
    );
    Ok(())
}
