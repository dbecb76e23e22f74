// File: ./src/cli.rs
//! Command-line flags and help text.
use anyhow::{Result, anyhow, bail};
use std::path::PathBuf;

/// Flags given on the command line. Unset values leave the config file in charge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub label: Option<String>,
    pub lead: Option<i64>,
    pub heading: Option<String>,
    pub todos: bool,
    pub debug: bool,
    pub config_file: Option<PathBuf>,
    pub help: bool,
}

impl CliArgs {
    /// Parses the arguments that follow the program name.
    /// Values may be given as `--flag value` or `--flag=value`.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut cli = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
                _ => (arg.clone(), None),
            };

            let mut value = |name: &str| -> Result<String> {
                match &inline {
                    Some(v) => Ok(v.clone()),
                    None => args
                        .next()
                        .ok_or_else(|| anyhow!("Missing value for {}", name)),
                }
            };

            match flag.as_str() {
                "-h" | "--help" => {
                    cli.help = true;
                    return Ok(cli);
                }
                "--label" => cli.label = Some(value("--label")?),
                "--heading" => cli.heading = Some(value("--heading")?),
                "--lead-time" => {
                    let raw = value("--lead-time")?;
                    let lead = raw.trim().parse::<i64>().map_err(|_| {
                        anyhow!("Invalid lead time '{}': expected a number of days", raw)
                    })?;
                    cli.lead = Some(lead);
                }
                "-c" | "--config-file" => {
                    cli.config_file = Some(PathBuf::from(value("--config-file")?))
                }
                "-t" | "--todos" => cli.todos = true,
                "-d" | "--debug" => cli.debug = true,
                other => bail!("Unknown option '{}' (see --help)", other),
            }
        }

        Ok(cli)
    }
}

pub fn print_help(binary_name: &str) {
    println!(
        "ical2rem v{} - Convert iCalendar events and todos to remind syntax",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [options] < input-file [> output-file]", binary_name);
    println!();
    println!("OPTIONS:");
    println!("        --label <LABEL>        Calendar name");
    println!("        --lead-time <DAYS>     Advance days to start reminders (default: 3)");
    println!("    -t, --todos                Process TODOs as well");
    println!("        --heading <HEADING>    Define a priority for static entries");
    println!("    -c, --config-file <FILE>   Use config file FILE");
    println!("    -d, --debug                Show debug info on stderr");
    println!("    -h, --help                 Show this help");
    println!();
    println!("CONFIG FILE (TOML):");
    println!("    label = \"Calendar\"");
    println!("    lead = 3");
    println!("    heading = \"\"");
    println!("    todos = false");
    println!("    debug = false");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs> {
        CliArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_no_args() {
        assert_eq!(parse(&[]).unwrap(), CliArgs::default());
    }

    #[test]
    fn test_all_flags() {
        let cli = parse(&[
            "--label",
            "Calendar",
            "--lead-time",
            "5",
            "-t",
            "--heading",
            "PRIORITY 9999",
            "-c",
            "/tmp/cfg.toml",
            "-d",
        ])
        .unwrap();
        assert_eq!(cli.label.as_deref(), Some("Calendar"));
        assert_eq!(cli.lead, Some(5));
        assert!(cli.todos);
        assert_eq!(cli.heading.as_deref(), Some("PRIORITY 9999"));
        assert_eq!(cli.config_file, Some(PathBuf::from("/tmp/cfg.toml")));
        assert!(cli.debug);
        assert!(!cli.help);
    }

    #[test]
    fn test_inline_values() {
        let cli = parse(&["--label=Work", "--lead-time=0", "--config-file=x.toml"]).unwrap();
        assert_eq!(cli.label.as_deref(), Some("Work"));
        assert_eq!(cli.lead, Some(0));
        assert_eq!(cli.config_file, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn test_help_stops_parsing() {
        let cli = parse(&["-h", "--no-such-flag"]).unwrap();
        assert!(cli.help);
    }

    #[test]
    fn test_errors() {
        assert!(parse(&["--label"]).is_err());
        assert!(parse(&["--lead-time", "soon"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
    }
}
