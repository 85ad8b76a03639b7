use structopt::StructOpt;
use pbrt_parser::core::pbrt::Options;
use pbrt_parser::core::scene::Scene;
use pbrt_parser::core::shape::build_scene_geometry;
use pbrt_parser::core::stats::SceneStats;
use pbrt_parser::core::fileutil::with_extension;
use std::path::{Path, PathBuf};
use num_cpus;
use anyhow::{Context, Result};
use fern::colors::{ColoredLevelConfig, Color};
use log::{error, info};

#[derive(StructOpt, Debug)]
#[structopt(name = "pbrt-info")]
/// Parses a pbrt scene (.pbrt) or a binary scene (.pbf) and prints
/// statistics about it.
struct Args {
    /// set LOG verbosity
    #[structopt(short, long)]
    verbose: bool,

    /// Write log messages to the given file as well.
    #[structopt(short, long, parse(from_os_str))]
    logfile: Option<PathBuf>,

    /// Print all logging messages to stderr
    #[structopt(short = "e", long)]
    logtostderr: bool,

    /// Only check that the scene parses, print nothing else.
    #[structopt(long)]
    lint: bool,

    /// Flatten the instance hierarchy to a single level before
    /// printing statistics or writing output.
    #[structopt(short, long)]
    single_level: bool,

    /// Use specified number of threads for building geometry
    #[structopt(short, long, default_value = "0")]
    nthreads: usize,

    /// Resolve relative file names in the scene against this directory
    /// instead of the directory of the input file.
    #[structopt(short, long, parse(from_os_str))]
    basepath: Option<PathBuf>,

    #[structopt(short, long, parse(from_os_str))]
    /// Write the scene as a binary file (.pbf is appended if missing)
    outfile: Option<PathBuf>,

    #[structopt(parse(from_os_str))]
    /// Path to the scene file
    input: PathBuf
}

fn setup_logging(verbose: bool, logfile: Option<PathBuf>, stderr: bool) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow);
    let clevel = colors.info(Color::Green);

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut base_config = fern::Dispatch::new().level(level);

    if let Some(f) = logfile {
        let file_config = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{}] {}",
                    record.level(),
                    message
                ))
            })
            .chain(fern::log_file(f)?);

        base_config = base_config.chain(file_config);
    }

    // Warnings and errors always reach the terminal.
    let stderr_level = if stderr { level } else { log::LevelFilter::Warn };

    let stderr_config = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}] {}",
                clevel.color(record.level()),
                message
            ))
        })
        .level(stderr_level)
        .chain(std::io::stderr());

    base_config.chain(stderr_config).apply()?;

    Ok(())
}

fn run(opts: &Options, input: &Path) -> Result<()> {
    println!("-------------------------------------------------------");
    println!("pbrt-info - printing info on {} ...", input.display());
    println!("-------------------------------------------------------");

    let mut scene = Scene::load(input, opts.base_path.as_deref())?;
    println!(" => parsing successful...");

    if opts.lint {
        return Ok(());
    }

    if opts.single_level {
        scene.make_single_level();
    }

    if let Some(out) = &opts.outfile {
        let out = with_extension(out, "pbf");
        let n = scene.save(&out)?;
        println!("wrote {} bytes to {}", n, out.display());
    }

    SceneStats::gather(&scene)
        .print(std::io::stdout())
        .context("failed to print statistics")?;

    let geometry = build_scene_geometry(&scene)?;
    println!("built {} shapes ({} primitives)", geometry.num_shapes, geometry.num_primitives);

    for (ty, n) in geometry.unsupported.iter() {
        println!(" - {}x\tskipped \"{}\"", n, ty);
    }

    println!("scene bounds {}", geometry.bounds);

    Ok(())
}

fn main() -> Result<()> {
    let mut opts = Options::new();
    let args: Args = Args::from_args();

    setup_logging(args.verbose, args.logfile, args.logtostderr)?;

    opts.nthreads = match args.nthreads {
        0 => num_cpus::get(),
        n => n
    };

    rayon::ThreadPoolBuilder::new().num_threads(opts.nthreads).build_global()?;

    opts.base_path = args.basepath;
    opts.outfile = args.outfile;
    opts.lint = args.lint;
    opts.single_level = args.single_level;

    info!("Using {} threads", opts.nthreads);

    if let Err(e) = run(&opts, &args.input) {
        error!("{:#}", e);
        eprintln!("(this means that either there's something wrong with that scene file, \
                   or that the parser can't handle it)");
        std::process::exit(1);
    }

    Ok(())
}
