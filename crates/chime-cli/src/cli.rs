use std::io::Write;
use std::path::PathBuf;

use chime_runtime::{DashboardConfig, LogFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands::{run_decode, run_export_query, run_params, run_replay};
use crate::error::Result;
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "chime",
    about = "Inspect CHIME dashboard hashes, parameters, and store sync",
    version
)]
pub struct Cli {
    /// Dashboard configuration (TOML, or JSON by extension).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format; overrides the configured one.
    #[arg(long = "log-format", value_enum, global = true)]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode a URL fragment into field values.
    Decode(FragmentArgs),

    /// Validate a fragment and print simulation parameters.
    Params(ParamsArgs),

    /// Print the PDF export link for a fragment.
    #[command(name = "export-query")]
    ExportQuery(FragmentArgs),

    /// Run a JSON event script through the reconciler.
    Replay(ReplayArgs),
}

#[derive(Debug, Args)]
pub struct FragmentArgs {
    /// Fragment such as `#n_days=60;market_share=25`.
    pub fragment: String,
}

#[derive(Debug, Args)]
pub struct ParamsArgs {
    /// Fragment, or a query string with `--query`.
    pub input: String,

    /// Treat the input as a `&`-joined export query.
    #[arg(long)]
    pub query: bool,
}

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON array of `{"at": <ms>, "event": <event>}` steps.
    pub script: PathBuf,

    /// Feed hash writes and widget updates back in, as a browser would.
    #[arg(long)]
    pub echo: bool,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let mut logging_config = config.logging.clone();
    if let Some(format) = cli.log_format {
        logging_config.format = format.into();
    }
    logging::init(&logging_config);
    let stdout = std::io::stdout();
    run(cli, &config, &mut stdout.lock())
}

/// Load and validate `--config`, or use defaults.
pub fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    Ok(config.validated()?)
}

pub fn run(cli: Cli, config: &DashboardConfig, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Commands::Decode(args) => run_decode(&args, config, out),
        Commands::Params(args) => run_params(&args, config, out),
        Commands::ExportQuery(args) => run_export_query(&args, config, out),
        Commands::Replay(args) => run_replay(&args, config, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "chime",
            "decode",
            "#n_days=60",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, Some(LogFormatArg::Json));
        assert!(matches!(cli.command, Commands::Decode(ref a) if a.fragment == "#n_days=60"));
    }

    #[test]
    fn export_query_uses_kebab_name() {
        let cli = Cli::try_parse_from(["chime", "export-query", "#n_days=60"]).unwrap();
        assert!(matches!(cli.command, Commands::ExportQuery(_)));
    }

    #[test]
    fn missing_config_defaults() {
        let cli = Cli::try_parse_from(["chime", "decode", ""]).unwrap();
        assert_eq!(load_config(&cli).unwrap(), DashboardConfig::default());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chime.toml");
        std::fs::write(&path, "[render]\ntable_stride = 0\n").unwrap();
        let cli = Cli::try_parse_from([
            "chime",
            "--config",
            path.to_str().unwrap(),
            "decode",
            "",
        ])
        .unwrap();
        let err = load_config(&cli).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
