use anyhow::{bail, Context, Result};
use clahe_core::compare::{compare_images, Comparison};
use clahe_core::pipeline::{enhance_image, load_image, process_file, save_image};
use clahe_core::preview::{contact_sheet, side_by_side, SheetLayout};
use clahe_core::{ClaheParams, ColorMode, GridSize};
use clap::{Args, Parser, Subcommand};
use image::DynamicImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "clahe",
    version,
    about = "Contrast Limited Adaptive Histogram Equalization for images"
)]
struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs the transform.
#[derive(Args, Debug, Clone)]
struct ParamArgs {
    /// Clip factor relative to a flat histogram (<= 0 disables clipping)
    #[arg(long, allow_negative_numbers = true)]
    clip_limit: Option<f64>,

    /// Tile grid as WxH, or N for an NxN grid
    #[arg(long)]
    grid: Option<GridSize>,

    /// Named preset: standard, dark, bright, coarse, fine
    #[arg(long)]
    preset: Option<String>,

    /// JSON file with `clip_limit` and/or `grid` fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Color handling: lab, rgb, luma
    #[arg(long, default_value_t = ColorMode::Lab)]
    mode: ColorMode,
}

#[derive(Subcommand)]
enum Commands {
    /// Enhance a single image
    Single {
        /// Input image path
        input: PathBuf,

        /// Output image path (default: clahe_<name> next to the input)
        output: Option<PathBuf>,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Enhance all images in a directory
    Batch {
        /// Input directory
        input_dir: PathBuf,

        /// Output directory (default: input_dir)
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        params: ParamArgs,

        /// Number of parallel jobs (default: num_cpus)
        #[arg(long, short)]
        jobs: Option<usize>,

        /// Reprocess even if output is up-to-date
        #[arg(long)]
        force: bool,

        /// Write original|enhanced previews for the first N images
        #[arg(long, default_value_t = 0)]
        previews: usize,

        /// Process without writing any files
        #[arg(long)]
        dry_run: bool,
    },

    /// Montage of one image under several clip limits and grid sizes
    Sweep {
        /// Input image path
        input: PathBuf,

        /// Output montage path (default: clahe_<stem>_sweep.png next to the input)
        output: Option<PathBuf>,

        /// Clip limits for the first row (grid fixed)
        #[arg(long, value_delimiter = ',', default_value = "1,2,3,4")]
        clip_limits: Vec<f64>,

        /// Grid sizes for the second row (clip limit fixed)
        #[arg(long, value_delimiter = ',', default_value = "4,8,16")]
        grids: Vec<GridSize>,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Compare two images pixel-by-pixel
    Compare {
        /// First image
        image_a: PathBuf,

        /// Second image
        image_b: PathBuf,

        /// Save visual diff to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List named presets
    Presets,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];
const OUTPUT_PREFIX: &str = "clahe_";

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_generated_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(OUTPUT_PREFIX))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))
}

fn file_stem(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))
}

/// `dir/clahe_<file name>`
fn output_path(input: &Path, dir: &Path) -> Result<PathBuf> {
    Ok(dir.join(format!("{}{}", OUTPUT_PREFIX, file_name(input)?)))
}

fn preview_path(input: &Path, dir: &Path) -> Result<PathBuf> {
    Ok(dir.join(format!("{}{}_preview.png", OUTPUT_PREFIX, file_stem(input)?)))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Resolve parameters: preset, then config file, then explicit flags.
fn build_params(args: &ParamArgs) -> Result<ClaheParams> {
    let mut params = match args.preset.as_deref() {
        Some(name) => ClaheParams::from_preset(name).with_context(|| {
            let names: Vec<&str> = ClaheParams::all_presets().iter().map(|(n, _)| *n).collect();
            format!("Unknown preset '{}'. Available: {}", name, names.join(", "))
        })?,
        None => ClaheParams::default(),
    };
    if let Some(path) = &args.config {
        params = params
            .with_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?;
    }
    if let Some(clip) = args.clip_limit {
        params = params.with_clip_limit(clip);
    }
    if let Some(grid) = args.grid {
        params = params.with_grid(grid);
    }
    params.validate()?;
    Ok(params)
}

fn is_up_to_date(input: &Path, output: &Path) -> bool {
    let modified = |p: &Path| p.metadata().and_then(|m| m.modified()).ok();
    match (modified(input), modified(output)) {
        (Some(in_time), Some(out_time)) => out_time > in_time,
        _ => false,
    }
}

fn cmd_single(
    input: &Path,
    output: Option<&Path>,
    params: &ClaheParams,
    mode: ColorMode,
) -> Result<()> {
    let out_path = match output {
        Some(p) => p.to_path_buf(),
        None => output_path(input, parent_dir(input))?,
    };

    eprintln!("Processing: {} -> {}", input.display(), out_path.display());
    log::info!("clip limit {}, grid {}, mode {}", params.clip_limit, params.grid, mode);

    let start = Instant::now();
    process_file(input, &out_path, params, mode)
        .with_context(|| format!("processing {}", input.display()))?;
    log::debug!("{} done in {:.2?}", input.display(), start.elapsed());
    eprintln!("Done: {}", out_path.display());
    Ok(())
}

/// Result of one batch item.
#[derive(Debug, PartialEq)]
enum Outcome {
    Processed,
    Failed(String),
}

struct BatchItem {
    input: PathBuf,
    output: PathBuf,
    preview: Option<PathBuf>,
}

#[derive(Debug, Default, PartialEq)]
struct BatchSummary {
    processed: usize,
    skipped: usize,
    failed: Vec<String>,
}

fn find_images(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .with_context(|| format!("reading {}", input_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image_file(p) && !is_generated_file(p))
        .collect();
    images.sort();
    Ok(images)
}

/// Split `images` into pending work and the number skipped as up-to-date.
fn plan_batch(
    images: &[PathBuf],
    output_dir: &Path,
    force: bool,
    previews: usize,
) -> Result<(Vec<BatchItem>, usize)> {
    let mut items = Vec::new();
    let mut skipped = 0;
    for (i, input) in images.iter().enumerate() {
        let output = output_path(input, output_dir)?;
        if !force && is_up_to_date(input, &output) {
            skipped += 1;
            continue;
        }
        let preview = if i < previews {
            Some(preview_path(input, output_dir)?)
        } else {
            None
        };
        items.push(BatchItem {
            input: input.clone(),
            output,
            preview,
        });
    }
    Ok((items, skipped))
}

fn process_item(
    item: &BatchItem,
    params: &ClaheParams,
    mode: ColorMode,
    dry_run: bool,
) -> Result<()> {
    let img = load_image(&item.input).context("failed to load")?;
    let result = enhance_image(&img, params, mode)?;
    if dry_run {
        return Ok(());
    }
    save_image(&result, &item.output).context("save failed")?;
    if let Some(preview) = &item.preview {
        side_by_side(&img, &result, SheetLayout::default())
            .save(preview)
            .context("preview failed")?;
    }
    Ok(())
}

fn run_batch(
    items: &[BatchItem],
    params: &ClaheParams,
    mode: ColorMode,
    dry_run: bool,
) -> Vec<Outcome> {
    items
        .par_iter()
        .map(|item| {
            let start = Instant::now();
            match process_item(item, params, mode, dry_run) {
                Ok(()) => {
                    eprintln!("  Done: {} ({:.2?})", item.output.display(), start.elapsed());
                    Outcome::Processed
                }
                Err(e) => {
                    let msg = format!("{}: {:#}", item.input.display(), e);
                    eprintln!("  Error: {}", msg);
                    Outcome::Failed(msg)
                }
            }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn cmd_batch(
    input_dir: &Path,
    output_dir: &Path,
    params: &ClaheParams,
    mode: ColorMode,
    jobs: Option<usize>,
    force: bool,
    previews: usize,
    dry_run: bool,
) -> Result<BatchSummary> {
    let images = find_images(input_dir)?;
    if images.is_empty() {
        eprintln!("No source images found in {}", input_dir.display());
        return Ok(BatchSummary::default());
    }

    if !dry_run {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("creating {}", output_dir.display()))?;
    }

    if let Some(n) = jobs {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
            log::warn!("could not resize thread pool: {}", e);
        }
    }

    let (items, skipped) = plan_batch(&images, output_dir, force, previews)?;
    eprintln!(
        "Found {} source images: {} to process, skipping {} up-to-date{}",
        images.len(),
        items.len(),
        skipped,
        if dry_run { " (dry run)" } else { "" }
    );
    log::info!("clip limit {}, grid {}, mode {}", params.clip_limit, params.grid, mode);

    let mut summary = BatchSummary {
        skipped,
        ..Default::default()
    };
    for outcome in run_batch(&items, params, mode, dry_run) {
        match outcome {
            Outcome::Processed => summary.processed += 1,
            Outcome::Failed(msg) => summary.failed.push(msg),
        }
    }

    eprintln!(
        "\nDone! Processed: {}, Skipped: {}, Failed: {}",
        summary.processed,
        summary.skipped,
        summary.failed.len()
    );
    for e in &summary.failed {
        eprintln!("  {}", e);
    }
    Ok(summary)
}

/// Rows: original + one cell per clip limit, original + one cell per grid.
fn sweep_rows(
    img: &DynamicImage,
    base: &ClaheParams,
    mode: ColorMode,
    clip_limits: &[f64],
    grids: &[GridSize],
) -> Result<Vec<Vec<DynamicImage>>> {
    let clip_row: Vec<ClaheParams> = clip_limits.iter().map(|&c| base.with_clip_limit(c)).collect();
    let grid_row: Vec<ClaheParams> = grids.iter().map(|&g| base.with_grid(g)).collect();

    let mut rows = Vec::with_capacity(2);
    for variants in [clip_row, grid_row] {
        if variants.is_empty() {
            continue;
        }
        let mut row = vec![img.clone()];
        for params in &variants {
            log::debug!("sweep cell: clip limit {}, grid {}", params.clip_limit, params.grid);
            row.push(enhance_image(img, params, mode)?);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn cmd_sweep(
    input: &Path,
    output: Option<&Path>,
    base: &ClaheParams,
    mode: ColorMode,
    clip_limits: &[f64],
    grids: &[GridSize],
) -> Result<()> {
    if clip_limits.is_empty() && grids.is_empty() {
        bail!("nothing to sweep: pass --clip-limits and/or --grids");
    }
    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => parent_dir(input).join(format!("{}{}_sweep.png", OUTPUT_PREFIX, file_stem(input)?)),
    };

    let img = load_image(input).with_context(|| format!("loading {}", input.display()))?;
    eprintln!(
        "Sweeping {}: clip limits [{}] at grid {}, grids [{}] at clip limit {}",
        input.display(),
        clip_limits.iter().map(f64::to_string).collect::<Vec<_>>().join(", "),
        base.grid,
        grids.iter().map(GridSize::to_string).collect::<Vec<_>>().join(", "),
        base.clip_limit
    );

    let rows = sweep_rows(&img, base, mode, clip_limits, grids)?;
    contact_sheet(&rows, SheetLayout::default())
        .save(&output_path)
        .with_context(|| format!("saving {}", output_path.display()))?;
    eprintln!("Done: {}", output_path.display());
    Ok(())
}

fn cmd_compare(image_a: &Path, image_b: &Path, diff_output: Option<&Path>) -> Result<()> {
    let a = image::open(image_a).with_context(|| format!("loading {}", image_a.display()))?;
    let b = image::open(image_b).with_context(|| format!("loading {}", image_b.display()))?;

    let (diff, visual) = match compare_images(&a, &b, diff_output.is_some()) {
        Comparison::DimensionMismatch { a, b } => {
            println!(
                "Images have different dimensions: {}x{} vs {}x{}",
                a.0, a.1, b.0, b.1
            );
            return Ok(());
        }
        Comparison::Compared { diff, visual } => (diff, visual),
    };

    println!("Image comparison: {} vs {}", image_a.display(), image_b.display());
    println!("Dimensions: {}x{}", diff.width, diff.height);
    println!("Total pixels: {}", diff.total_pixels());
    println!("Exact matches: {} ({:.2}%)", diff.exact_matches, diff.match_percent());
    if diff.is_identical() {
        println!("Images are identical");
    }
    let mae = diff.mean_abs_error;
    println!("MAE per channel (R,G,B): {:.4}, {:.4}, {:.4}", mae[0], mae[1], mae[2]);
    let max = diff.max_error;
    println!("Max error per channel (R,G,B): {}, {}, {}", max[0], max[1], max[2]);

    if let (Some(img), Some(out_path)) = (visual, diff_output) {
        img.save(out_path)
            .with_context(|| format!("saving {}", out_path.display()))?;
        println!("Visual diff saved to: {}", out_path.display());
    }
    Ok(())
}

fn cmd_presets() {
    for (name, params) in ClaheParams::all_presets() {
        println!("{:<10} clip limit {:<4} grid {}", name, params.clip_limit, params.grid);
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Single {
            input,
            output,
            params,
        } => {
            let resolved = build_params(&params)?;
            cmd_single(&input, output.as_deref(), &resolved, params.mode)?;
        }

        Commands::Batch {
            input_dir,
            output_dir,
            params,
            jobs,
            force,
            previews,
            dry_run,
        } => {
            let resolved = build_params(&params)?;
            let output = output_dir.unwrap_or_else(|| input_dir.clone());
            let summary = cmd_batch(
                &input_dir,
                &output,
                &resolved,
                params.mode,
                jobs,
                force,
                previews,
                dry_run,
            )?;
            if !summary.failed.is_empty() && summary.processed == 0 {
                bail!("all {} images failed", summary.failed.len());
            }
        }

        Commands::Sweep {
            input,
            output,
            clip_limits,
            grids,
            params,
        } => {
            let resolved = build_params(&params)?;
            cmd_sweep(
                &input,
                output.as_deref(),
                &resolved,
                params.mode,
                &clip_limits,
                &grids,
            )?;
        }

        Commands::Compare {
            image_a,
            image_b,
            output,
        } => {
            cmd_compare(&image_a, &image_b, output.as_deref())?;
        }

        Commands::Presets => cmd_presets(),
    }

    Ok(())
}
