use anyhow::{Context, Result};
use ical2rem::cli::{self, CliArgs};
use ical2rem::config::{Config, Options};
use ical2rem::context::StandardContext;
use ical2rem::model::ParseError;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::io::{self, Read, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = env::args();
    let binary_name = args.next().unwrap_or_else(|| "ical2rem".to_string());

    let cli = match CliArgs::parse(args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.help {
        cli::print_help(&binary_name);
        return ExitCode::SUCCESS;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<ParseError>().is_some() => {
            log::debug!("{}", e);
            eprintln!("Could not parse ICalendar, aborting.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &CliArgs) -> Result<()> {
    let ctx = StandardContext::new(None);
    let config = Config::load(&ctx, cli.config_file.as_deref())?;
    let options = Options::layer(config, cli);

    init_logging(options.debug);
    log::debug!("{:?}", options);

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read calendar from stdin")?;

    let output = ical2rem::convert(&input, &options.format)?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|_| stdout.flush())
        .context("Failed to write to stdout")?;
    Ok(())
}

fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    // A logger may already be installed; that is not worth failing over.
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}
