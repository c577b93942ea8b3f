mod convert;
mod core;
mod emulator;
mod gamepad;
mod host;
mod placement;
mod renderer;
mod shared;
mod sync;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::convert::{ConversionMode, ConversionRequest, Converter, HeightmapConverter};
use crate::core::commands::parse_downscale_arg;
use crate::core::{Config, Scheduler, Session};
use crate::emulator::{Emulator, EmulatorFactory, Library, ReplayCore};
use crate::gamepad::ButtonRegions;
use crate::host::events::spawn_event_reader;
use crate::host::{ConsoleHost, JsonStore};
use crate::placement::OWNERS;
use crate::renderer::{encoder, Frame, FrameProcessor, Palette, ProcessSettings};
use crate::shared::constants;
use crate::utils::logger;
use crate::utils::time_utils::Timer;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file; defaults to <config dir>/brickscreen/config.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the screen: host events on stdin, console commands on stdout
    Run,
    /// Push one raw RGBA frame through the pipeline and the converter
    Process {
        input: PathBuf,
        #[arg(long, default_value_t = constants::SCREEN_WIDTH)]
        width: usize,
        #[arg(long, default_value_t = constants::SCREEN_HEIGHT)]
        height: usize,
        /// Block size (2, 4 or 8)
        #[arg(short, long)]
        downscale: Option<String>,
        /// Snap colors to the server palette
        #[arg(short, long, default_value_t = false)]
        snap: bool,
        #[arg(short, long, value_enum)]
        mode: Option<ConversionMode>,
        /// Stop after writing the PNG
        #[arg(long, default_value_t = false)]
        png_only: bool,
    },
    /// Print the palette scanned from the server settings
    Palette {
        settings: Option<PathBuf>,
    },
    /// Print the default configuration
    DefaultConfig,
    /// List the ROMs on disk
    Roms,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, problem) = Config::load(cli.config.as_deref());
    logger::init(&config.paths.logs);
    if let Some(e) = problem {
        eprintln!("brickscreen: {:#}", e);
        logger::error(&format!("{:#}", e));
    }
    logger::info(&format!(
        "Config: {}",
        cli.config.clone().unwrap_or_else(Config::default_path).display()
    ));

    match cli.command {
        Commands::Run => run(&config)?,
        Commands::Process { input, width, height, downscale, snap, mode, png_only } => {
            let block = downscale.as_deref().map(parse_downscale_arg).transpose()?;
            let settings = ProcessSettings {
                downscale: block.is_some(),
                block: block.unwrap_or(config.toggles.block),
                snap,
            };
            process(&config, input, width, height, settings, mode, png_only)?;
        }
        Commands::Palette { settings } => {
            let source = settings.or_else(|| config.paths.palette_source.clone());
            let palette = Palette::load(source.as_deref());
            for color in palette.colors() {
                println!("{:3} {:3} {:3}", color.0, color.1, color.2);
            }
            println!("{} colors", palette.len());
        }
        Commands::DefaultConfig => {
            println!("{}", Config::default().to_json()?);
        }
        Commands::Roms => {
            let library = Library::new(&config.paths.roms, &config.paths.saves);
            for rom in library.roms()? {
                println!("{}", rom);
            }
        }
    }

    Ok(())
}

fn converter(config: &Config) -> HeightmapConverter {
    HeightmapConverter::new(
        &config.converter.program,
        config.converter.scale,
        config.converter.verbosity,
        config.converter.timeout(),
    )
}

fn run(config: &Config) -> Result<()> {
    let palette = Palette::load(config.paths.palette_source.as_deref());
    let store = JsonStore::open(&config.paths.store)?;
    let buttons = ButtonRegions::load(&store).unwrap_or_else(|e| {
        logger::warn(&format!("{:#}; starting with no buttons", e));
        ButtonRegions::new()
    });

    let factory: EmulatorFactory =
        Box::new(|| -> Result<Box<dyn Emulator>> { Ok(Box::new(ReplayCore::new())) });
    let session = Session::new(config, palette, buttons, factory)?;

    let mut scheduler = Scheduler::new(
        session,
        ConsoleHost::new(io::stdout()),
        store,
        Arc::new(converter(config)),
        config.timing.clone(),
    );

    let running = scheduler.running_flag();
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let (sender, receiver) = crossbeam_channel::unbounded();
    // the reader thread stays blocked on stdin at exit; it is not joined
    let _reader = spawn_event_reader(BufReader::new(io::stdin()), sender);

    logger::info("Screen running");
    scheduler.run(receiver)
}

fn process(
    config: &Config,
    input: PathBuf,
    width: usize,
    height: usize,
    settings: ProcessSettings,
    mode: Option<ConversionMode>,
    png_only: bool,
) -> Result<()> {
    let timer = Timer::new();
    let data = utils::file_utils::read_file(&input)?;
    let mut frame = Frame::from_rgba(width, height, data)
        .with_context(|| format!("{} is not a {}x{} RGBA dump", input.display(), width, height))?;

    let palette = if settings.snap {
        Palette::load(config.paths.palette_source.as_deref())
    } else {
        Palette::white()
    };
    let mut processor = FrameProcessor::new(palette);
    processor.process_frame(&mut frame, &settings);

    let image = config.paths.work.join(constants::FRAME_IMAGE_FILE);
    encoder::write_png(&frame, &image)?;
    println!("Wrote {} ({} ms)", image.display(), timer.elapsed_ms());
    if png_only {
        return Ok(());
    }

    let request = ConversionRequest {
        input: image,
        output: config.paths.artifacts.join(format!(
            "{}0.{}",
            constants::TEMP_ARTIFACT_PREFIX,
            constants::ARTIFACT_EXTENSION
        )),
        owner: OWNERS[0],
        mode: mode.unwrap_or(config.converter.mode),
    };
    let reduction = converter(config).convert(&request, &AtomicBool::new(false))?;
    println!(
        "Reduced {} to {}, wrote {} ({} ms)",
        reduction.before,
        reduction.after,
        request.output.display(),
        timer.elapsed_ms()
    );
    Ok(())
}
