//! Application setup and command dispatch with builder pattern.

use std::error::Error;

use cellsplat_data::{Bounds2, CellTable, load_scene, save_splats};
use cellsplat_merge::AssetMerger;
use cellsplat_split::{CellExporter, ScenePartitioner, SplitConfig};
use tracing::{info, warn};

use crate::cli::{Command, InspectArgs, MergeArgs, SplitArgs};

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Application builder.
pub struct AppBuilder {
    logging: LoggingConfig,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            logging: LoggingConfig::default(),
        }
    }

    /// Configure logging.
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = config;
        self
    }

    /// Run one command.
    pub fn run(self, command: Command) -> Result<(), Box<dyn Error>> {
        self.init_logging();

        match command {
            Command::Split(args) => split(args),
            Command::Merge(args) => merge(args),
            Command::Inspect(args) => inspect(args),
        }
    }

    fn init_logging(&self) {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.logging.level)),
            )
            .with_target(false)
            .init();
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the split configuration: file first, then flags.
pub fn split_config(args: &SplitArgs) -> Result<SplitConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => SplitConfig::load(path)?,
        None => SplitConfig::default(),
    };

    if let Some(rows) = args.rows {
        config.rows = rows;
    }
    if let Some(cols) = args.cols {
        config.cols = cols;
    }
    if let Some(plane) = args.plane {
        config.plane = plane;
    }
    if let Some(driver) = args.driver {
        config.strategy.driver = driver.into();
    }
    if let Some(position) = args.camera_position {
        config.strategy.camera_position = position.into();
    }
    if args.trim_references {
        config.trim_references = true;
    }

    config.validate()?;
    Ok(config)
}

fn split(args: SplitArgs) -> Result<(), Box<dyn Error>> {
    let partitioner = ScenePartitioner::new(split_config(&args)?)?;
    let config = partitioner.config();
    info!(
        "Splitting {} into {}x{} cells on the {:?} plane",
        args.input.display(),
        config.rows,
        config.cols,
        config.plane
    );

    let scene = load_scene(&args.input)?;
    if scene.is_empty() {
        return Err(format!("scene {} holds no points or cameras", args.input.display()).into());
    }
    let partition = partitioner.partition(&scene)?;
    if partition.cells.is_empty() {
        warn!("No cell survived partitioning; nothing to export");
    }

    let exporter = CellExporter::new(&args.output)
        .with_intrinsics_from(&args.input)
        .with_table(!args.no_table);
    exporter.export(&partition)?;

    info!(
        "Split complete: {} cells written to {}",
        partition.cells.len(),
        exporter.root().display()
    );
    Ok(())
}

fn merge(args: MergeArgs) -> Result<(), Box<dyn Error>> {
    let table = CellTable::load(&args.cells)?;
    let merger = AssetMerger::new(table, args.plane);
    let output = merger.merge_dir(&args.assets, &args.extension)?;
    save_splats(&args.output, &output.splats)?;

    info!(
        "Merge complete: {} splats kept ({} culled) and written to {}",
        output.report.kept(),
        output.report.culled(),
        args.output.display()
    );
    Ok(())
}

fn inspect(args: InspectArgs) -> Result<(), Box<dyn Error>> {
    let scene = load_scene(&args.input)?;
    if scene.is_empty() {
        warn!("Scene {} holds no points or cameras", args.input.display());
    }

    let point_bounds =
        Bounds2::enclosing(scene.points.values().map(|p| args.plane.project(p.position)));
    let camera_bounds =
        Bounds2::enclosing(scene.cameras.values().map(|c| args.plane.project(c.translation)));
    let observations: usize = scene.cameras.values().map(|c| c.observations.len()).sum();
    let track_entries: usize = scene.points.values().map(|p| p.track.len()).sum();

    println!("Scene: {}", args.input.display());
    println!("  points:              {}", scene.points.len());
    println!("  cameras:             {}", scene.cameras.len());
    println!("  track entries:       {}", track_entries);
    println!("  dangling entries:    {}", scene.dangling_track_entries());
    println!("  2D observations:     {}", observations);
    println!("  point bounds ({:?}):  {}", args.plane, describe(point_bounds));
    println!("  camera bounds ({:?}): {}", args.plane, describe(camera_bounds));
    Ok(())
}

/// The error message followed by each cause its text does not already
/// include.
pub fn error_report(err: &dyn Error) -> String {
    let mut report = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !report.contains(&text) {
            report.push_str("\n  caused by: ");
            report.push_str(&text);
        }
        source = cause.source();
    }
    report
}

fn describe(bounds: Option<Bounds2>) -> String {
    match bounds {
        Some(b) => format!("[{}, {}] x [{}, {}]", b.min.x, b.max.x, b.min.y, b.max.y),
        None => "empty".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, DriverArg};
    use cellsplat_data::GroundPlane;
    use cellsplat_split::Driver;
    use clap::Parser;

    fn split_args(extra: &[&str]) -> SplitArgs {
        let mut argv = vec!["cellsplat", "split", "-i", "in", "-o", "out"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Split(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_split_config_defaults() {
        assert_eq!(split_config(&split_args(&[])).unwrap(), SplitConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("split.json");
        std::fs::write(
            &path,
            r#"{ "rows": 4, "cols": 4, "plane": "xy", "thresholds": { "min_points": 3 } }"#,
        )
        .unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        let args = split_args(&[
            "--config",
            path_arg.as_str(),
            "--cols",
            "6",
            "--driver",
            "cameras",
        ]);
        assert_eq!(args.driver, Some(DriverArg::Cameras));

        let config = split_config(&args).unwrap();
        assert_eq!((config.rows, config.cols), (4, 6));
        assert_eq!(config.plane, GroundPlane::XY);
        assert_eq!(config.strategy.driver, Driver::Cameras);
        assert_eq!(config.thresholds.min_points, 3);
    }

    #[test]
    fn test_zero_rows_rejected() {
        assert!(split_config(&split_args(&["--rows", "0"])).is_err());
    }

    #[test]
    fn test_empty_scene_refused() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        cellsplat_data::save_scene(input.path(), &cellsplat_data::Scene::default()).unwrap();

        let mut args = split_args(&[]);
        args.input = input.path().to_path_buf();
        args.output = output.path().join("cells");
        let err = split(args).unwrap_err();
        assert!(err.to_string().contains("no points or cameras"));
        assert!(!output.path().join("cells").exists());
    }

    #[derive(Debug)]
    struct ExportFailed(std::io::Error);

    impl std::fmt::Display for ExportFailed {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("export failed")
        }
    }

    impl Error for ExportFailed {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_error_report_lists_causes() {
        let err = ExportFailed(std::io::Error::other("disk full"));
        assert_eq!(error_report(&err), "export failed\n  caused by: disk full");
    }

    #[test]
    fn test_error_report_skips_embedded_causes() {
        let dir = tempfile::tempdir().unwrap();
        let err = CellTable::load(dir.path().join("absent.txt")).unwrap_err();
        let report = error_report(&err);
        assert_eq!(report, err.to_string());
        assert!(!report.contains("caused by"));
    }

    #[test]
    fn test_describe_bounds() {
        let b = Bounds2::enclosing([glam::DVec2::new(1.0, -2.0), glam::DVec2::new(3.5, 4.0)]);
        assert_eq!(describe(b), "[1, 3.5] x [-2, 4]");
        assert_eq!(describe(None), "empty");
    }
}
