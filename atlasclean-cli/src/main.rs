use anyhow::{Context, Result};
use atlasclean_algorithms::{label_statistics_table, CleanupOptions, IslandCleaner};
use atlasclean_core::IntensityVolume;
use atlasclean_io::{read_intensity_volume, read_label_volume, write_label_volume, VolumeFormat};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

mod logging;

#[derive(Parser)]
#[command(name = "atlasclean")]
#[command(version, about = "Relabel small islands in segmentation label atlases", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relabel islands at or below a size threshold to their closest neighbour label
    Clean(CleanArgs),

    /// Print intensity statistics for every label of an atlas
    Stats {
        /// Label atlas
        #[arg(long, value_name = "FILE")]
        atlas: PathBuf,

        /// Intensity image co-registered with the atlas
        #[arg(long, value_name = "FILE")]
        volume: PathBuf,
    },
}

#[derive(Args)]
struct CleanArgs {
    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Input label atlas (.nii or .nii.gz)
    #[arg(long, value_name = "FILE")]
    input_atlas: Option<PathBuf>,

    /// Output label atlas (.nii or .nii.gz)
    #[arg(long, value_name = "FILE")]
    output_atlas: Option<PathBuf>,

    /// T1 intensity image
    #[arg(long = "input-t1", value_name = "FILE")]
    input_t1: Option<PathBuf>,

    /// Optional T2 intensity image
    #[arg(long = "input-t2", value_name = "FILE")]
    input_t2: Option<PathBuf>,

    /// Only clean these labels (comma-separated)
    #[arg(long, value_name = "LIST", conflicts_with_all = ["exclude_labels", "label"])]
    include_labels: Option<String>,

    /// Clean every label except these (comma-separated)
    #[arg(long, value_name = "LIST", conflicts_with = "label")]
    exclude_labels: Option<String>,

    /// Clean a single label
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    label: Option<i16>,

    /// Largest island size, in voxels, that gets relabeled
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    maximum_island_voxel_count: Option<i64>,

    /// Use 26-connectivity instead of 6-connectivity for islands
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    fully_connected: Option<bool>,

    /// Never let an island keep its own label
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    force_suspicious_label_change: Option<bool>,

    /// Also write the run report as JSON
    #[arg(long, value_name = "FILE")]
    report_json: Option<PathBuf>,
}

impl CleanArgs {
    fn to_options(&self) -> CleanupOptions {
        CleanupOptions {
            input_atlas_path: self.input_atlas.clone(),
            output_atlas_path: self.output_atlas.clone(),
            input_t1_path: self.input_t1.clone(),
            input_t2_path: self.input_t2.clone(),
            include_labels_list: self
                .include_labels
                .clone()
                .or_else(|| self.label.map(|l| l.to_string())),
            exclude_labels_list: self.exclude_labels.clone(),
            maximum_island_voxel_count: self.maximum_island_voxel_count,
            use_fully_connected_in_connected_component_filter: self.fully_connected,
            force_suspicious_label_change: self.force_suspicious_label_change,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(&cli.log_level)?;

    match cli.command {
        Commands::Clean(args) => run_clean(&args),
        Commands::Stats { atlas, volume } => run_stats(&atlas, &volume),
    }
}

fn run_clean(args: &CleanArgs) -> Result<()> {
    let file_options = match &args.config {
        Some(path) => CleanupOptions::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => CleanupOptions::default(),
    };
    let job = file_options
        .merge(args.to_options())
        .validate()
        .context("Invalid configuration")?;
    VolumeFormat::from_path(&job.output_atlas).context("Invalid output atlas path")?;

    let mut atlas = read_label_volume(&job.input_atlas)
        .with_context(|| format!("Failed to read atlas {}", job.input_atlas.display()))?;
    let channels = job
        .intensity_paths()
        .into_iter()
        .map(|path| {
            read_intensity_volume(path)
                .with_context(|| format!("Failed to read intensity image {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    let channel_refs: Vec<&IntensityVolume> = channels.iter().collect();

    tracing::info!(
        "Atlas {} ({}), {} intensity channel(s)",
        job.input_atlas.display(),
        atlas.dims(),
        channel_refs.len(),
    );

    let stats = IslandCleaner::new(job.config)
        .run(&mut atlas, &channel_refs)
        .context("Island cleanup failed")?;

    write_label_volume(&atlas, &job.output_atlas)
        .with_context(|| format!("Failed to write atlas {}", job.output_atlas.display()))?;
    tracing::info!("Wrote {}", job.output_atlas.display());

    println!("{}", stats);

    if let Some(path) = &args.report_json {
        std::fs::write(path, stats.to_json()?)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    Ok(())
}

fn run_stats(atlas: &Path, volume: &Path) -> Result<()> {
    let labels = read_label_volume(atlas)
        .with_context(|| format!("Failed to read atlas {}", atlas.display()))?;
    let intensity = read_intensity_volume(volume)
        .with_context(|| format!("Failed to read intensity image {}", volume.display()))?;

    let table = label_statistics_table(&labels, &intensity).context("Label statistics failed")?;
    println!("{}", table);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlasclean_algorithms::LabelSelection;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_label_shorthand() {
        let cli = Cli::try_parse_from([
            "atlasclean",
            "clean",
            "--label",
            "99",
            "--maximum-island-voxel-count",
            "5",
        ])
        .unwrap();
        let Commands::Clean(args) = cli.command else {
            panic!("expected clean");
        };
        let config = args.to_options().to_config().unwrap();
        assert_eq!(config.selection, LabelSelection::Include(vec![99]));
    }

    #[test]
    fn test_boolean_flags_override_both_ways() {
        let parse = |extra: &[&str]| {
            let mut argv = vec!["atlasclean", "clean"];
            argv.extend_from_slice(extra);
            let cli = Cli::try_parse_from(argv).unwrap();
            let Commands::Clean(args) = cli.command else {
                panic!("expected clean");
            };
            args.to_options()
        };

        let unset = parse(&[]);
        assert_eq!(unset.force_suspicious_label_change, None);
        assert_eq!(unset.use_fully_connected_in_connected_component_filter, None);

        let on = parse(&["--force-suspicious-label-change", "--fully-connected"]);
        assert_eq!(on.force_suspicious_label_change, Some(true));
        assert_eq!(on.use_fully_connected_in_connected_component_filter, Some(true));

        let off = parse(&["--force-suspicious-label-change=false"]);
        assert_eq!(off.force_suspicious_label_change, Some(false));

        let file = CleanupOptions {
            maximum_island_voxel_count: Some(3),
            force_suspicious_label_change: Some(true),
            ..Default::default()
        };
        assert!(!file.merge(off).to_config().unwrap().force_change);
    }

    #[test]
    fn test_include_exclude_conflict() {
        let result = Cli::try_parse_from([
            "atlasclean",
            "clean",
            "--include-labels",
            "1",
            "--exclude-labels",
            "2",
        ]);
        assert!(result.is_err());
    }
}
