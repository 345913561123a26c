use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use tablecoco::split::{DEFAULT_SPLIT_SEED, check_ratio};
use tablecoco::{
    ConvertError, Converter, ConverterConfig, SourceFormat, split_dataset, write_split,
};

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    PageXml,
    Manifest,
}

impl From<FormatArg> for SourceFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::PageXml => SourceFormat::PageXml,
            FormatArg::Manifest => SourceFormat::Manifest,
        }
    }
}

#[derive(Parser)]
#[command(name = "tablecoco")]
#[command(about = "Convert table row/column annotations into a COCO dataset")]
struct Cli {
    /// Data directory holding annotations and images
    #[arg(value_name = "DATA_DIR")]
    data_dir: PathBuf,

    /// Output dataset file [default: DATA_DIR/annotations.json]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// JSON configuration file (category vocabulary, layout, info)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Annotation source format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Manifest file, relative to DATA_DIR
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Write the surviving pages even if some pages fail
    #[arg(long)]
    best_effort: bool,

    /// Worker threads for per-page conversion
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Also write a train/val split with this train ratio, e.g. 0.9
    #[arg(long, value_name = "RATIO")]
    split: Option<f64>,

    /// Seed for the train/val shuffle
    #[arg(long, default_value_t = DEFAULT_SPLIT_SEED)]
    seed: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = match &args.config {
        Some(path) => ConverterConfig::from_json_file(path)?,
        None => ConverterConfig::default(),
    };
    if let Some(format) = args.format {
        config.format = format.into();
    }
    if let Some(manifest) = args.manifest {
        config.manifest = manifest;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    config.best_effort |= args.best_effort;
    if let Some(ratio) = args.split {
        check_ratio(ratio)?;
    }

    let output = args
        .output
        .unwrap_or_else(|| args.data_dir.join("annotations.json"));

    println!("Converting annotations in {}", args.data_dir.display());
    let converter = Converter::new(&args.data_dir, config)?;

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("#>-"),
    );

    let conversion = match converter.convert_to_file(&output, Some(&progress)) {
        Ok(conversion) => conversion,
        Err(ConvertError::Rejected(diagnostics)) => {
            progress.abandon();
            eprintln!("\n=== Conversion Report ===");
            eprint!("{}", diagnostics.summary());
            anyhow::bail!(
                "{} page(s) failed; fix the sources or rerun with --best-effort",
                diagnostics.failure_count()
            );
        }
        Err(e) => {
            progress.abandon();
            return Err(e.into());
        }
    };
    progress.finish_and_clear();

    let dataset = &conversion.dataset;
    println!(
        "Wrote {} ({} images, {} annotations, {} categories)",
        output.display(),
        dataset.images.len(),
        dataset.annotations.len(),
        dataset.categories.len()
    );
    if !conversion.diagnostics.is_empty() {
        println!("\n=== Conversion Report ===");
        print!("{}", conversion.diagnostics.summary());
    }

    if let Some(ratio) = args.split {
        let split = split_dataset(dataset, ratio, args.seed, true)?;
        let (train_path, val_path) = write_split(&split, &output)?;
        println!(
            "Split: {} train images -> {}, {} val images -> {}",
            split.train.images.len(),
            train_path.display(),
            split.val.images.len(),
            val_path.display()
        );
    }

    Ok(())
}
