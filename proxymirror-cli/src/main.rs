// proxymirror-cli/src/main.rs
//
// Entry point for the proxymirror binary: parses arguments, wires Ctrl-C to
// the pipeline's cancellation flag, runs the command and maps the outcome to
// an exit code (0 when the run completes, even with per-file errors; 1 on
// fatal errors).

use clap::Parser;
use proxymirror_cli::{Cli, Commands, run_build, terminal};

use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit code used when a second Ctrl-C aborts the run.
const EXIT_INTERRUPTED: i32 = 130;

fn install_interrupt_handler(cancel: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        if cancel.swap(true, Ordering::SeqCst) {
            process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("Interrupt received: finishing running encodes (Ctrl-C again to abort)");
    });
    if let Err(e) = result {
        terminal::print_error(&format!("Failed to install Ctrl-C handler: {e}"));
    }
}

fn main() {
    let cli = Cli::parse();

    let cancel = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(Arc::clone(&cancel));

    let result = match cli.command {
        Commands::Build(args) => run_build(args, cancel),
    };

    if let Err(e) = result {
        log::error!("{e}");
        terminal::print_error(&e.to_string());
        process::exit(1);
    }
}
