//! Command-line surface of the `genconsole` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "genconsole", version, about = "Follow AI generation runs from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a generation run and follow its progress
    Generate(GenerateArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Generation resource, e.g. `branding`, `business-plan` or `diagrams`
    #[arg(long)]
    pub resource: String,

    /// Project the generation belongs to
    #[arg(long = "project")]
    pub project_id: String,

    /// Session key; defaults to the resource name
    #[arg(long)]
    pub session: Option<String>,

    /// Extra query parameter for the stream request (`key=value`, repeatable)
    #[arg(long = "query", value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,

    /// JSON file posted as additional info before the stream opens
    #[arg(long)]
    pub info_json: Option<PathBuf>,

    /// File attached to the additional info form (`field=path`, repeatable)
    #[arg(long = "file", value_parser = parse_key_value)]
    pub files: Vec<(String, String)>,

    /// Base URL of the generation API
    #[arg(long, env = "GENCONSOLE_API_BASE")]
    pub api_base: Option<String>,

    /// Number of steps the run is expected to have
    #[arg(long)]
    pub expected_steps: Option<u32>,

    /// Fixed delay between reconnect attempts, in milliseconds
    #[arg(long)]
    pub reconnect_delay_ms: Option<u64>,

    /// Reconnect attempts before a dropped stream is reported as failed
    #[arg(long)]
    pub max_reconnects: Option<u32>,

    /// Directory receiving the session snapshot and step outputs
    #[arg(long, env = "GENCONSOLE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Settings file (RON); `./genconsole.ron` is used when present
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "GENCONSOLE_LOG")]
    pub log_level: Option<String>,

    /// Also write logs to ./genconsole.log
    #[arg(long)]
    pub log_file: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_repeated_pairs() {
        let cli = Cli::try_parse_from([
            "genconsole",
            "generate",
            "--resource",
            "branding",
            "--project",
            "p-1",
            "--query",
            "lang=en",
            "--query",
            "tone=bold",
            "--file",
            "logo=./logo.png",
        ])
        .unwrap();

        let Command::Generate(args) = cli.command;
        assert_eq!(args.resource, "branding");
        assert_eq!(args.project_id, "p-1");
        assert_eq!(
            args.query,
            vec![
                ("lang".to_string(), "en".to_string()),
                ("tone".to_string(), "bold".to_string())
            ]
        );
        assert_eq!(
            args.files,
            vec![("logo".to_string(), "./logo.png".to_string())]
        );
    }

    #[test]
    fn rejects_pair_without_key() {
        assert!(parse_key_value("=value").is_err());
        assert!(parse_key_value("novalue").is_err());
        assert_eq!(
            parse_key_value("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
    }
}
