use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, Result};
use log::{error, info, LevelFilter};

use lodeb::platform::UnavailableEngine;
use lodeb::tui::{App, AppConfig};
use lodeb::{Session, SessionConfig};

/// Default state file, relative to the working directory
const DEFAULT_STATE_FILE: &str = ".lodeb_state";

/// Parsed command line
#[derive(Debug)]
struct Options {
    state_file: PathBuf,
    log_file: Option<PathBuf>,
    log_level: LevelFilter,
    exe_path: Option<String>,
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program_name = args.first().map_or("lodeb", String::as_str);

    let options = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(Some(options)) => options,
        Ok(None) => process::exit(0),
        Err(e) => {
            eprintln!("{}", e);
            print_usage(program_name);
            process::exit(2);
        }
    };

    // The terminal belongs to the UI, so logs only ever go to a file
    if let Some(path) = options.log_file.as_deref() {
        lodeb::init_logging(options.log_level, Some(path))?;
    }
    info!("Starting {} v{}", lodeb::PKG_NAME, lodeb::VERSION);

    let session = Session::with_config(UnavailableEngine::new(), SessionConfig::default());
    let config = AppConfig {
        state_file: Some(options.state_file),
        ..AppConfig::default()
    };

    let mut app = App::new(session, config);
    app.startup(options.exe_path);

    if let Err(e) = app.run() {
        error!("Error running application: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    if let Err(e) = app.shutdown() {
        error!("{:#}", e);
    }

    info!("{} exiting", lodeb::PKG_NAME);
    Ok(())
}

/// Parse command line arguments (without the program name)
///
/// Returns `Ok(None)` when the request was fully handled (help, version).
fn parse_args(args: &[String]) -> Result<Option<Options>> {
    let mut options = Options {
        state_file: PathBuf::from(DEFAULT_STATE_FILE),
        log_file: None,
        log_level: LevelFilter::Info,
        exe_path: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            // Version
            "-v" | "--version" => {
                println!("{} v{}", lodeb::PKG_NAME, lodeb::VERSION);
                println!("{}", lodeb::PKG_DESCRIPTION);
                return Ok(None);
            }
            // Help
            "-h" | "--help" => {
                print_usage(lodeb::PKG_NAME);
                return Ok(None);
            }
            "--state" => {
                i += 1;
                let value = args.get(i).ok_or_else(|| anyhow!("--state needs a file"))?;
                options.state_file = PathBuf::from(value);
            }
            "--log" => {
                i += 1;
                let value = args.get(i).ok_or_else(|| anyhow!("--log needs a file"))?;
                options.log_file = Some(PathBuf::from(value));
            }
            "--log-level" => {
                i += 1;
                let value = args.get(i).ok_or_else(|| anyhow!("--log-level needs a level"))?;
                options.log_level = value
                    .parse()
                    .map_err(|_| anyhow!("Invalid log level: {}", value))?;
            }
            flag if flag.starts_with('-') => return Err(anyhow!("Unknown option: {}", flag)),
            // Target program
            exe => {
                if options.exe_path.is_some() {
                    return Err(anyhow!("Only one executable can be given"));
                }
                options.exe_path = Some(exe.to_string());
            }
        }

        i += 1;
    }

    Ok(Some(options))
}

/// Print usage information
fn print_usage(program_name: &str) {
    println!("Usage: {} [options] [executable]", program_name);
    println!();
    println!("Options:");
    println!("  -h, --help            Display this help message");
    println!("  -v, --version         Display version information");
    println!("  --state <file>        Session state file (default: {})", DEFAULT_STATE_FILE);
    println!("  --log <file>          Append logs to <file>");
    println!("  --log-level <level>   off, error, warn, info, debug or trace (default: info)");
    println!();
    println!("Keyboard Controls:");
    println!("  Ctrl+P         Command palette (@name searches symbols)");
    println!("  Ctrl+L         Load the target");
    println!("  F5             Start or continue");
    println!("  Shift+F5       Kill the process");
    println!("  F10 / F11      Step over / step into");
    println!("  Ctrl+B         Toggle breakpoint at the cursor line");
    println!("  Up/Down        Move the cursor (Ctrl: select frame)");
    println!("  Ctrl+R         Reload the source file");
    println!("  e / w          Edit executable / working directory");
    println!("  a / x          Add / remove a watch expression");
    println!("  q              Quit");
}
