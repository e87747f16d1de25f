use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::ArgAction::{Append, Set, SetTrue};
use clap::Parser;
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use base::prelude::*;
use hostloop::{
    attach_disk_file, init_machine, install_rom_file, FrameLoopDriver, HeadlessHost, Host,
    IdleEngine, LoopConfig, SystemClock,
};

mod display;
mod sleep;

use display::TerminalDisplay;
use sleep::FrameSleeper;

/// Run the emulated machine in real time
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Disk image to attach.  May be given more than once; the first
    /// image becomes disk 0, the next disk 1, and so on.
    #[clap(action = Append, long = "disk", value_name = "FILE")]
    disks: Vec<PathBuf>,

    /// File to use as the boot ROM instead of the built-in one.
    #[clap(action = Set, long, value_name = "FILE")]
    rom: Option<PathBuf>,

    /// Report execution faults as they happen.
    #[clap(action = SetTrue, long)]
    debug: bool,

    /// Run without a display.
    #[clap(action = SetTrue, long)]
    headless: bool,
}

#[derive(Debug)]
enum Fail {
    /// The command line could not be understood.
    Usage(clap::Error),
    /// The display could not be set up.
    Display(String),
    /// We were not able to correctly initialise the emulator.
    InitialisationFailure(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::Usage(e) => e.fmt(f),
            Fail::Display(msg) | Fail::InitialisationFailure(msg) => f.write_str(msg.as_str()),
        }
    }
}

impl Error for Fail {}

/// Parses the command line.  Returns `Ok(None)` when the user only
/// asked for help or version information, which has then already been
/// printed.
fn parse_args<I, T>(args: I) -> Result<Option<Cli>, Fail>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                if let Err(print_error) = e.print() {
                    return Err(Fail::InitialisationFailure(format!(
                        "failed to print usage information: {print_error}"
                    )));
                }
                Ok(None)
            }
            _ => Err(Fail::Usage(e)),
        },
    }
}

fn init_tracing() -> Result<(), Fail> {
    // See
    // https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/fmt/index.html#filtering-events-with-environment-variables
    // for instructions on how to select which trace messages get
    // printed.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Fail::InitialisationFailure(format!(
                "failed to initialise tracing filter (perhaps there is a problem with environment variables): {e}"
            )));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
    Ok(())
}

fn run_emulator() -> Result<(), Fail> {
    let cli = match parse_args(std::env::args_os())? {
        Some(cli) => cli,
        None => {
            return Ok(());
        }
    };
    init_tracing()?;

    let engine = IdleEngine::new();
    let mut machine = init_machine(&engine);
    machine.debug = cli.debug;
    machine.headless = cli.headless;
    for (id, path) in cli.disks.iter().enumerate() {
        attach_disk_file(&mut machine, id, path);
    }
    if let Some(rom) = cli.rom.as_deref() {
        install_rom_file(&mut machine, rom);
    }

    let mut host: Box<dyn Host> = if cli.headless {
        Box::new(HeadlessHost)
    } else {
        Box::new(TerminalDisplay::new().map_err(Fail::Display)?)
    };

    let mut driver = FrameLoopDriver::new(
        LoopConfig::blocking(TimingConfig::default()),
        machine,
        engine,
        SystemClock::new(),
    )
    .map_err(|e| Fail::InitialisationFailure(format!("invalid timing configuration: {e}")))?;

    let span = span!(Level::ERROR, "emulate", headless = cli.headless, debug = cli.debug);
    let _enter = span.enter();
    let mut sleeper = FrameSleeper::new();
    let frames = driver.run_blocking(host.as_mut(), &mut sleeper);
    event!(Level::INFO, "emulation finished after {frames} frames");
    Ok(())
}

fn main() {
    match run_emulator() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}
