#![forbid(unsafe_code)]

//! Command-line argument parsing.
//!
//! Parses args manually (no external dependencies) to keep the binary
//! lean. Flags mirror the traditional picker interface; `IFS` controls
//! the description separator set and `COLUMNS`/`LINES` force the
//! terminal size.

use std::env;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
usage: fpick [-hvKS] [-d [-o]] [-x | -X] [-q query]
    -h          output this help message and exit
    -v          output the version and exit
    -K          disable toggling of keypad transmit mode
    -S          disable sorting
    -d          read and display descriptions
    -o          output description of selected on exit
    -x          enable alternate screen
    -X          disable alternate screen
    -q query    supply an initial search query

keys: type to narrow; arrows or ^N/^P move the selection; Enter accepts,
Alt-Enter accepts the query text itself, ^C cancels, ^O toggles sorting.

environment: IFS (description separators), COLUMNS/LINES (forced size),
FPICK_LOG (stderr tracing filter).";

/// Parsed command-line options.
#[derive(Debug, Clone)]
pub struct Opts {
    /// Read and display descriptions (`-d`).
    pub descriptions: bool,
    /// Print the selected choice's description too (`-o`).
    pub output_description: bool,
    /// Initial query (`-q`).
    pub query: String,
    /// Score-based sorting (disabled by `-S`).
    pub sort: bool,
    /// Toggle keypad transmit mode (disabled by `-K`).
    pub keypad: bool,
    /// Use the alternate screen (`-x`/`-X`).
    pub alternate_screen: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            descriptions: false,
            output_description: false,
            query: String::new(),
            sort: true,
            keypad: true,
            alternate_screen: true,
        }
    }
}

impl Opts {
    /// Parse `std::env::args`, exiting on `-h`, `-v`, or a usage error.
    #[must_use]
    pub fn parse() -> Self {
        match Self::parse_from(env::args().skip(1)) {
            Ok(Parsed::Run(opts)) => opts,
            Ok(Parsed::Help) => {
                eprintln!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Parsed::Version) => {
                println!("{VERSION}");
                process::exit(0);
            }
            Err(msg) => {
                eprintln!("fpick: {msg}");
                eprintln!("{HELP_TEXT}");
                process::exit(1);
            }
        }
    }

    /// Parse from an explicit argument list (testable core).
    ///
    /// # Errors
    ///
    /// Reports unknown flags, a missing `-q` value, or stray positional
    /// arguments.
    pub fn parse_from<I>(args: I) -> Result<Parsed, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut opts = Opts::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let Some(flags) = arg.strip_prefix('-') else {
                return Err(format!("unexpected argument: {arg}"));
            };
            if flags.is_empty() {
                return Err("unexpected argument: -".to_owned());
            }
            let mut chars = flags.chars();
            while let Some(flag) = chars.next() {
                match flag {
                    'd' => opts.descriptions = true,
                    'h' => return Ok(Parsed::Help),
                    'K' => opts.keypad = false,
                    // Only meaningful when descriptions are read and
                    // displayed, so it latches the current -d state.
                    'o' => opts.output_description = opts.descriptions,
                    'q' => {
                        let rest: String = chars.collect();
                        let value = if rest.is_empty() {
                            args.next().ok_or("option -q requires a value")?
                        } else {
                            rest
                        };
                        opts.query = value;
                        break;
                    }
                    'S' => opts.sort = false,
                    'v' => return Ok(Parsed::Version),
                    'x' => opts.alternate_screen = true,
                    'X' => opts.alternate_screen = false,
                    other => return Err(format!("unknown option: -{other}")),
                }
            }
        }
        Ok(Parsed::Run(opts))
    }
}

/// Outcome of argument parsing.
#[derive(Debug, Clone)]
pub enum Parsed {
    Run(Opts),
    Help,
    Version,
}

/// The description separator set: bytes of `IFS`, default a single space.
#[must_use]
pub fn separators() -> Vec<u8> {
    env::var("IFS")
        .ok()
        .filter(|s| !s.is_empty())
        .map_or_else(|| b" ".to_vec(), String::into_bytes)
}
