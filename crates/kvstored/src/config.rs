//! CLI front door (§4.M) — hand-rolled flag parsing over
//! `std::env::args()`, matching this codebase's existing convention
//! (no `clap` anywhere in the dependency graph). Produces a
//! [`ServerConfig`] or a usage error.

use std::net::IpAddr;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 7379;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_DB_FILE: &str = "kvstore.db";
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_BACKLOG: u32 = 1024;
pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 64;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: IpAddr,
    pub db_file: PathBuf,
    pub capacity: Option<usize>,
    pub workers: usize,
    pub daemonize: bool,
    pub log_file: Option<PathBuf>,
    pub backlog: u32,
    pub auto_save: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.parse().unwrap(),
            db_file: PathBuf::from(DEFAULT_DB_FILE),
            capacity: None,
            workers: DEFAULT_WORKERS,
            daemonize: false,
            log_file: None,
            backlog: DEFAULT_BACKLOG,
            auto_save: true,
        }
    }
}

/// What to do after parsing argv.
pub enum ParseOutcome {
    Run(ServerConfig),
    Help,
    Version,
}

pub const USAGE: &str = "\
Usage: kvstored [OPTIONS]

Options:
  -p, --port <N>        Listen port (default: 7379)
  -b, --bind <ADDR>      Bind address (default: 127.0.0.1)
  -f, --db-file <PATH>   Snapshot file path (default: kvstore.db)
  -c, --capacity <N>     Initial hash table capacity
  -w, --workers <N>      Reaper worker threads, 1..64 (default: 4)
  -d, --daemonize        Fork into the background
  -l, --log-file <PATH>  Write logs to a file instead of stderr
      --backlog <N>      Listen backlog (default: 1024)
      --no-auto-save     Skip saving the snapshot on clean shutdown
  -h, --help             Print this message
  -v, --version          Print the version
";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("option {0} requires a value")]
    MissingValue(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("--workers must be between {MIN_WORKERS} and {MAX_WORKERS}, got {0}")]
    WorkersOutOfRange(usize),
}

/// Parse argv (excluding argv[0]) into a [`ParseOutcome`].
pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<ParseOutcome, ConfigError> {
    let mut cfg = ServerConfig::default();
    let mut iter = args.into_iter().peekable();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::Help),
            "-v" | "--version" => return Ok(ParseOutcome::Version),
            "-p" | "--port" => {
                let v = next_value(&mut iter, &arg)?;
                cfg.port = v
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(arg.clone(), v))?;
            }
            "-b" | "--bind" => {
                let v = next_value(&mut iter, &arg)?;
                cfg.bind = v
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(arg.clone(), v))?;
            }
            "-f" | "--db-file" => {
                let v = next_value(&mut iter, &arg)?;
                cfg.db_file = PathBuf::from(v);
            }
            "-c" | "--capacity" => {
                let v = next_value(&mut iter, &arg)?;
                let n: usize = v
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(arg.clone(), v))?;
                cfg.capacity = Some(n);
            }
            "-w" | "--workers" => {
                let v = next_value(&mut iter, &arg)?;
                let n: usize = v
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(arg.clone(), v))?;
                if !(MIN_WORKERS..=MAX_WORKERS).contains(&n) {
                    return Err(ConfigError::WorkersOutOfRange(n));
                }
                cfg.workers = n;
            }
            "-d" | "--daemonize" => cfg.daemonize = true,
            "-l" | "--log-file" => {
                let v = next_value(&mut iter, &arg)?;
                cfg.log_file = Some(PathBuf::from(v));
            }
            "--backlog" => {
                let v = next_value(&mut iter, &arg)?;
                cfg.backlog = v
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(arg.clone(), v))?;
            }
            "--no-auto-save" => cfg.auto_save = false,
            other => return Err(ConfigError::UnknownOption(other.to_string())),
        }
    }

    Ok(ParseOutcome::Run(cfg))
}

fn next_value(
    iter: &mut std::iter::Peekable<impl Iterator<Item = String>>,
    flag: &str,
) -> Result<String, ConfigError> {
    iter.next().ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}
