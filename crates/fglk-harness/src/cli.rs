#![forbid(unsafe_code)]

//! Command-line argument parsing for the harness.
//!
//! Arguments are parsed by hand. Every option has an `FGLK_*` environment
//! variable that sets its default; explicit flags win.

use std::env;
use std::path::PathBuf;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
fglk-harness: drive the built-in demo story over JSON lines

USAGE:
    fglk-harness [OPTIONS]

Reads one renderer event per line on stdin and writes one outbound record
per line on stdout. Logs go to stderr.

OPTIONS:
    --transcript=PATH          Append a glktra transcript to PATH
    --session-id=ID            Session id stamped on transcript stanzas
    --label=TEXT               Label stamped on transcript stanzas
    --log=FILTER               Log filter, e.g. 'debug' or 'fglk_runtime=trace' (default: warn)
    --render-transcript=PATH   Print a recorded transcript as plain text and exit
    --help, -h                 Show this help message
    --version, -V              Show version

ENVIRONMENT VARIABLES:
    FGLK_TRANSCRIPT            Override --transcript
    FGLK_SESSION_ID            Override --session-id
    FGLK_LABEL                 Override --label
    FGLK_LOG                   Override --log
    FGLK_RENDER_TRANSCRIPT     Override --render-transcript";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    pub transcript: Option<PathBuf>,
    /// Defaults to a value derived from the start time.
    pub session_id: Option<String>,
    pub label: Option<String>,
    /// `tracing-subscriber` env-filter directive.
    pub log: String,
    pub render_transcript: Option<PathBuf>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            transcript: None,
            session_id: None,
            label: None,
            log: "warn".into(),
            render_transcript: None,
        }
    }
}

/// What parsing asks the caller to do besides running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Run(Opts),
    Help,
    Version,
    Invalid(String),
}

impl Opts {
    /// Parse the process arguments and environment, exiting on `--help`,
    /// `--version` or a bad argument.
    pub fn parse() -> Self {
        let env_opts = Self::from_env(|key| env::var(key).ok());
        match Self::parse_args(env_opts, env::args().skip(1)) {
            Parsed::Run(opts) => opts,
            Parsed::Help => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Parsed::Version => {
                println!("fglk-harness {VERSION}");
                process::exit(0);
            }
            Parsed::Invalid(msg) => {
                eprintln!("{msg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Defaults with environment overrides applied.
    pub fn from_env(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut opts = Self::default();
        if let Some(val) = var("FGLK_TRANSCRIPT") {
            opts.transcript = Some(val.into());
        }
        if let Some(val) = var("FGLK_SESSION_ID") {
            opts.session_id = Some(val);
        }
        if let Some(val) = var("FGLK_LABEL") {
            opts.label = Some(val);
        }
        if let Some(val) = var("FGLK_LOG") {
            opts.log = val;
        }
        if let Some(val) = var("FGLK_RENDER_TRANSCRIPT") {
            opts.render_transcript = Some(val.into());
        }
        opts
    }

    /// Apply command-line `args` on top of `opts`.
    pub fn parse_args(mut opts: Self, args: impl IntoIterator<Item = String>) -> Parsed {
        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Parsed::Help,
                "--version" | "-V" => return Parsed::Version,
                other => {
                    if let Some(val) = other.strip_prefix("--transcript=") {
                        opts.transcript = Some(val.into());
                    } else if let Some(val) = other.strip_prefix("--session-id=") {
                        opts.session_id = Some(val.to_string());
                    } else if let Some(val) = other.strip_prefix("--label=") {
                        opts.label = Some(val.to_string());
                    } else if let Some(val) = other.strip_prefix("--log=") {
                        opts.log = val.to_string();
                    } else if let Some(val) = other.strip_prefix("--render-transcript=") {
                        opts.render_transcript = Some(val.into());
                    } else {
                        return Parsed::Invalid(format!("Unknown argument: {other}"));
                    }
                }
            }
        }
        Parsed::Run(opts)
    }
}
