//! terramex CLI - point-grid datasets for the Mexico flood study

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use terramex_core::io::read_geotiff;
use terramex_pipeline::presets::{self, NAMES};
use terramex_pipeline::{run_all, Exporter, LocalCatalog, Pipeline, PipelineConfig, PipelineOutput};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "terramex")]
#[command(author, version, about = "Point-grid environmental datasets over Mexico", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in pipelines
    List,
    /// Print a pipeline definition as YAML
    Show {
        /// Preset name (srtm, era5, smap, chirps, modis)
        name: String,
    },
    /// Run one pipeline and export its table
    Run {
        /// Preset name; ignored when --config is given
        name: Option<String>,
        /// YAML pipeline definition
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory laid out as <id>/<band>.tif or <id>/<date>/<band>.tif
        #[arg(long)]
        catalog: PathBuf,
        /// Export root; files land in <output>/<folder>/<description>.csv
        #[arg(short, long, default_value = "exports")]
        output: PathBuf,
        /// Sampling seed
        #[arg(long)]
        seed: Option<u64>,
        /// Maximum number of sampled points
        #[arg(long)]
        num_pixels: Option<usize>,
    },
    /// Run every built-in pipeline concurrently
    RunAll {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(short, long, default_value = "exports")]
        output: PathBuf,
    },
    /// Show the map layers a pipeline offers
    Layers {
        /// Preset name
        name: String,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(name: Option<&str>, path: Option<&Path>) -> Result<PipelineConfig> {
    match (path, name) {
        (Some(path), _) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load pipeline from {}", path.display())),
        (None, Some(name)) => presets::by_name(name).context("Failed to build preset"),
        (None, None) => anyhow::bail!("Give a preset name or --config. Presets: {}", NAMES.join(", ")),
    }
}

fn export(output: &PipelineOutput, root: &Path) -> Result<PathBuf> {
    let pb = spinner(&format!("Exporting {}...", output.job.description));
    let handle = Exporter::local(root)
        .submit(output.job.clone(), &output.table)
        .context("Export rejected")?;
    let path = handle.wait().context("Export failed")?;
    pb.finish_and_clear();
    Ok(path)
}

/// Error summarising every `(pipeline, reason)` failure, if any.
fn report_failures(failures: &[(String, String)], total: usize) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    for (name, reason) in failures {
        warn!("{name} failed: {reason}");
    }
    let names: Vec<&str> = failures.iter().map(|(name, _)| name.as_str()).collect();
    anyhow::bail!("{} of {} pipelines failed: {}", failures.len(), total, names.join(", "))
}

fn done(name: &str, rows: usize, path: &Path, elapsed: std::time::Duration) {
    println!("{} ({} points) saved to: {}", name, rows, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::List => {
            for config in presets::all()? {
                let span = match &config.window {
                    Some(w) => w.to_string(),
                    None => "static".to_string(),
                };
                println!(
                    "{:<8} {:<32} {:>6} m  {:<26} {}",
                    config.name, config.title, config.scale, span, config.export.description
                );
            }
        }

        Commands::Show { name } => {
            let config = presets::by_name(&name)?;
            print!("{}", config.to_yaml()?);
        }

        Commands::Run {
            name,
            config,
            catalog,
            output,
            seed,
            num_pixels,
        } => {
            let mut config = load_config(name.as_deref(), config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(n) = num_pixels {
                config.num_pixels = n;
            }
            let pipeline = Pipeline::new(config).context("Invalid pipeline")?;
            let catalog = LocalCatalog::new(catalog);

            let start = Instant::now();
            let pb = spinner(&format!("Running {}...", pipeline.name()));
            let result = pipeline.run(&catalog);
            pb.finish_and_clear();
            let result = result.with_context(|| format!("Pipeline {} failed", pipeline.name()))?;

            let path = export(&result, &output)?;
            done(pipeline.name(), result.table.len(), &path, start.elapsed());
        }

        Commands::RunAll { catalog, output } => {
            let pipelines = NAMES
                .iter()
                .map(|n| Pipeline::preset(n))
                .collect::<terramex_pipeline::Result<Vec<_>>>()?;
            let catalog = LocalCatalog::new(catalog);

            let start = Instant::now();
            let pb = spinner(&format!("Running {} pipelines...", pipelines.len()));
            let results = run_all(&pipelines, &catalog);
            pb.finish_and_clear();

            // Keep exporting after a failure; report them all at the end
            let mut failures = Vec::new();
            for (pipeline, result) in pipelines.iter().zip(results) {
                let exported = result
                    .map_err(anyhow::Error::from)
                    .and_then(|out| export(&out, &output).map(|path| (out, path)));
                match exported {
                    Ok((out, path)) => done(pipeline.name(), out.table.len(), &path, start.elapsed()),
                    Err(e) => failures.push((pipeline.name().to_string(), format!("{e:#}"))),
                }
            }
            report_failures(&failures, pipelines.len())?;
        }

        Commands::Layers { name } => {
            let config = presets::by_name(&name)?;
            println!("{}", config.title);
            for layer in &config.layers {
                let marker = if layer.primary { "[x]" } else { "[ ]" };
                let palette = layer
                    .vis
                    .palette
                    .as_ref()
                    .map(|p| p.colors().iter().map(|c| c.to_hex()).collect::<Vec<_>>().join(" "))
                    .unwrap_or_else(|| "grayscale".to_string());
                println!(
                    "  {} {:<40} {:<26} [{}, {}] {}",
                    marker, layer.label, layer.band, layer.vis.min, layer.vis.max, palette
                );
            }
        }

        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let raster: terramex_core::Raster<f64> =
                read_geotiff(&input).context("Failed to read raster")?;
            pb.finish_and_clear();
            info!("Input: {} x {}", raster.cols(), raster.rows());

            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_takes_overrides_and_default_output() {
        let cli = Cli::try_parse_from([
            "terramex", "run", "chirps", "--catalog", "/data", "--seed", "7", "--num-pixels", "500",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                name,
                config,
                catalog,
                output,
                seed,
                num_pixels,
            } => {
                assert_eq!(name.as_deref(), Some("chirps"));
                assert!(config.is_none());
                assert_eq!(catalog, PathBuf::from("/data"));
                assert_eq!(output, PathBuf::from("exports"));
                assert_eq!(seed, Some(7));
                assert_eq!(num_pixels, Some(500));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_accepts_a_config_file_instead_of_a_name() {
        let cli = Cli::try_parse_from(["terramex", "run", "-c", "lst.yaml", "--catalog", "cat", "-o", "out"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run { name: None, config: Some(_), .. }
        ));
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["terramex", "list", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn missing_required_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["terramex", "run-all"]).is_err());
        assert!(Cli::try_parse_from(["terramex", "show"]).is_err());
        assert!(Cli::try_parse_from(["terramex", "run", "srtm"]).is_err());
        assert!(Cli::try_parse_from(["terramex", "run", "srtm", "--catalog", "c", "--seed", "x"]).is_err());
        assert!(Cli::try_parse_from(["terramex", "export"]).is_err());
    }

    #[test]
    fn run_all_reports_every_failure() {
        assert!(report_failures(&[], 5).is_ok());

        let failures = vec![
            ("era5".to_string(), "source ERA5 unavailable".to_string()),
            ("modis".to_string(), "Export failed: disk full".to_string()),
        ];
        let err = report_failures(&failures, 5).unwrap_err().to_string();
        assert_eq!(err, "2 of 5 pipelines failed: era5, modis");
    }
}
