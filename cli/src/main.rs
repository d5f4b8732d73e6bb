//! Headless runner for the `nescore` NES emulation core (spec.md §6's "CLI"
//! external interface). Wires a ROM file to a no-op pixel sink and an input
//! source that never presses a button — the windowing, audio output, and
//! input polling a real frontend would supply are explicitly out of scope
//! (spec.md §1) and belong to a host embedding this crate, not this binary.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use nescore::controller::NoInput;
use nescore::ppu::NullSink;
use nescore::{Error, Nes};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Headless NES emulator core runner.
#[derive(Parser, Debug)]
#[command(name = "nescore", about = "Headless runner for the nescore NES emulation core", long_about = None)]
struct Args {
    /// Path to the iNES 1.0 ROM file to run.
    rom: PathBuf,

    /// Number of frames to run before exiting cleanly.
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // clap already printed usage/diagnostics to stderr.
            let _ = err.print();
            return ExitCode::from(1);
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunError::Argument(err)) => {
            error!("{err}");
            ExitCode::from(1)
        }
        Err(RunError::Fault(err)) => {
            error!("{err}");
            // spec.md §6: "negative on unrecoverable runtime fault". ExitCode
            // is unsigned, so drop to the raw process API for this one case.
            std::process::exit(-1);
        }
    }
}

enum RunError {
    /// A bad ROM path or ROM image: ill-formed command line, missing file,
    /// or a cartridge spec.md §7 calls out as load-time rejection.
    Argument(Error),
    /// A programmer-visible fault raised mid-emulation (spec.md §7 kind 2).
    Fault(Error),
}

impl From<Error> for RunError {
    fn from(err: Error) -> Self {
        match err {
            Error::Fault { .. } => RunError::Fault(err),
            other => RunError::Argument(other),
        }
    }
}

fn run(args: &Args) -> Result<(), RunError> {
    let cartridge = nescore::load_cartridge_from_file(&args.rom)?;
    info!(mapper = cartridge.mapper_name(), rom = %args.rom.display(), "loaded cartridge");

    let mut nes: Nes = Nes::new(NoInput, NoInput);
    nes.load_cartridge(cartridge);

    let mut sink = NullSink;
    for frame in 0..args.frames {
        if !nes.run_frame(&mut sink) {
            info!(frame, "host requested stop");
            break;
        }
        if nes.cpu().halted {
            return Err(RunError::Fault(Error::fault(
                nes.cpu().reg.pc,
                "CPU halted on an illegal opcode",
            )));
        }
    }

    info!(frames = args.frames, "shutdown complete");
    Ok(())
}
