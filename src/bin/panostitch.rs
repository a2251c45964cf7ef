use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "panostitch", version)]
struct Cli {
    /// Log verbosity on stderr (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stitch images into one panorama PNG.
    Stitch(StitchArgs),
    /// Print the stitch plan (center, transforms, bounds, draw order) as JSON.
    Plan(SessionArgs),
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// JSON config with `ratio_threshold` and/or `matches_threshold`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the ratio-test threshold.
    #[arg(long)]
    ratio: Option<f32>,

    /// Override the minimum correspondence count for a pair.
    #[arg(long)]
    min_matches: Option<usize>,

    /// Use the image with this name (file stem) as reference frame.
    #[arg(long)]
    center: Option<String>,

    /// Run matching and warping on a worker pool.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Input images, in insertion order.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct StitchArgs {
    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    session: SessionArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Stitch(args) => cmd_stitch(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn build_session(args: &SessionArgs) -> anyhow::Result<panostitch::Stitcher> {
    let mut config = match &args.config {
        Some(path) => panostitch::StitcherConfig::from_path(path)?,
        None => panostitch::StitcherConfig::default(),
    };
    if let Some(r) = args.ratio {
        config.ratio_threshold = r;
    }
    if let Some(n) = args.min_matches {
        config.matches_threshold = n;
    }

    let threading = panostitch::StitchThreading {
        parallel: args.parallel,
        threads: args.threads,
    };
    let mut sess = panostitch::Stitcher::new(config)?.with_threading(threading)?;
    for path in &args.images {
        sess.add_image_path(path, None)
            .with_context(|| format!("add image '{}'", path.display()))?;
    }
    if let Some(name) = &args.center {
        sess.set_center_by_name(name)?;
    }
    Ok(sess)
}

fn cmd_stitch(args: StitchArgs) -> anyhow::Result<()> {
    let mut sess = build_session(&args.session)?;
    let pano = sess.stitch()?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    pano.save_png(&args.out)?;

    eprintln!("wrote {} ({}x{})", args.out.display(), pano.width, pano.height);
    Ok(())
}

fn cmd_plan(args: SessionArgs) -> anyhow::Result<()> {
    let mut sess = build_session(&args)?;
    let plan = sess.plan()?;
    let json = serde_json::to_string_pretty(&plan).context("serialize plan")?;
    println!("{json}");
    Ok(())
}
