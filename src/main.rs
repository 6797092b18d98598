use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use procnet::cli::Cli;
use procnet::engine::{Engine, EngineConfig};
use procnet::error::ProcnetError;
use procnet::output;
use procnet::system::ProcRoot;

/// Global shutdown flag, set by signal handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(
            libc::SIGTERM,
            signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGINT,
            signal_handler as *const () as libc::sighandler_t,
        );
    }
}

fn exit_code(err: &ProcnetError) -> i32 {
    match err {
        ProcnetError::TableRead { .. } => 2,
        ProcnetError::TableParse { .. } => 3,
        _ => 4,
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(exit_code(&e));
        }
    }
}

fn run(cli: Cli) -> Result<(), ProcnetError> {
    install_signal_handlers();

    let mut engine = Engine::new(EngineConfig {
        proc_root: ProcRoot::new(&cli.proc_root),
        protocols: cli.proto.to_set(),
        limits: cli.limits(),
    });

    let interval = Duration::from_secs_f64(cli.interval);
    let mut completed: u64 = 0;
    let stdout = io::stdout();

    while !SHUTDOWN_REQUESTED.load(Ordering::Relaxed) {
        let started = Instant::now();
        let report = engine.tick()?;

        log::info!(
            "tick {}: {} tracked, {} new, {} removed, {} edges in {:.1}ms",
            completed + 1,
            engine.registry().len(),
            report.created,
            report.removed,
            report.edges.len(),
            started.elapsed().as_secs_f64() * 1e3,
        );

        let rows = output::snapshot_rows(engine.registry(), &report);
        output::write_snapshot(&rows, cli.format, &mut stdout.lock())?;

        completed += 1;
        if cli.ticks != 0 && completed >= cli.ticks {
            break;
        }
        thread::sleep(interval);
    }

    Ok(())
}
