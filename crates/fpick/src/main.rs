#![forbid(unsafe_code)]

//! fpick binary entry point.

use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::AsFd;
use std::process;

use fpick::cli::{self, Opts};
use fpick::controller::{Controller, Selection};
use fpick_core::term::{SessionOptions, TermSession};
use fpick_engine::query::QueryBuffer;
use fpick_engine::store::ChoiceStore;

fn main() {
    let opts = Opts::parse();
    init_logging();

    match run(&opts) {
        Ok(Selection::Choice { text, description }) => {
            let mut stdout = io::stdout().lock();
            let printed = stdout
                .write_all(&text)
                .and_then(|()| stdout.write_all(b"\n"))
                .and_then(|()| {
                    if opts.output_description {
                        stdout.write_all(description.as_deref().unwrap_or_default())?;
                        stdout.write_all(b"\n")?;
                    }
                    stdout.flush()
                });
            if let Err(e) = printed {
                eprintln!("fpick: {e}");
                process::exit(1);
            }
        }
        Ok(Selection::Query(query)) => {
            println!("{query}");
            if opts.output_description {
                println!();
            }
        }
        Ok(Selection::Aborted) => process::exit(1),
        Err(e) => {
            eprintln!("fpick: {e}");
            process::exit(1);
        }
    }
}

fn run(opts: &Opts) -> io::Result<Selection> {
    let session = TermSession::open(SessionOptions {
        keypad: opts.keypad,
        alternate_screen: opts.alternate_screen,
    })?;

    // An owned duplicate of stdin: the controller polls and reads the
    // descriptor directly, with no buffering layer in between.
    let stdin = File::from(io::stdin().as_fd().try_clone_to_owned()?);

    let store = ChoiceStore::new(opts.descriptions, cli::separators());
    let query = QueryBuffer::seeded(opts.query.clone());
    let mut controller = Controller::new(session, store, query, opts.sort, stdin);
    controller.run()
}

/// Stderr tracing, enabled by `FPICK_LOG` (EnvFilter syntax). Stderr is
/// safe to log to: the UI owns `/dev/tty` and the result goes to stdout.
fn init_logging() {
    if let Ok(filter) = env::var("FPICK_LOG") {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
            .with_writer(io::stderr)
            .try_init();
    }
}
