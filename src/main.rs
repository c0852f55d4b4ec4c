// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use scriptvox::app_config::{self, Config};
use scriptvox::app_controller::{parse_voice_arg, Controller, SynthesisRequest};
use scriptvox::script::dialogue_preview;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Options shared by every command that reads the configuration
#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the characters of a script with line counts and a dialogue preview
    Parse {
        /// Script document (.pdf or plain text)
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Synthesize the dialogue of one or more characters
    Synthesize(SynthesizeArgs),

    /// Generate shell completions for scriptvox
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args, Debug)]
struct SynthesizeArgs {
    /// Script document (.pdf or plain text)
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Reference voice for a character, as NAME=sample.wav (repeatable)
    #[arg(short, long = "voice", value_name = "NAME=FILE", required = true)]
    voices: Vec<String>,

    /// Only synthesize these characters (repeatable)
    #[arg(long = "character", value_name = "NAME")]
    characters: Vec<String>,

    /// Output directory for line files and archives
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Synthesis server endpoint
    #[arg(short, long, env = "SCRIPTVOX_ENDPOINT")]
    endpoint: Option<String>,

    /// Maximum concurrent synthesis requests
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    #[command(flatten)]
    common: CommonArgs,
}

/// scriptvox - voice every line of a film script
#[derive(Parser, Debug)]
#[command(name = "scriptvox")]
#[command(version)]
#[command(about = "Per-character dialogue synthesis for film scripts")]
#[command(long_about = "scriptvox finds the speaking characters of a script and synthesizes each of their lines with a cloned reference voice.

EXAMPLES:
    scriptvox parse script.pdf                                  # List characters and line counts
    scriptvox synthesize script.pdf -v JOHN=john.wav            # Voice every line of JOHN
    scriptvox synthesize script.pdf -v JOHN=j.wav -v SARAH=s.wav --character SARAH
    scriptvox completions bash > scriptvox.bash                 # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation, filtered by the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info, the config may lower or raise it once loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "scriptvox", &mut std::io::stdout());
            Ok(())
        }
        Commands::Parse { script, json, common } => {
            let config = load_config(&common)?;
            run_parse(config, &script, json).await
        }
        Commands::Synthesize(args) => {
            let mut config = load_config(&args.common)?;
            if let Some(endpoint) = &args.endpoint {
                config.backend.endpoint = endpoint.clone();
            }
            if let Some(jobs) = args.jobs {
                config.synthesis.concurrent_jobs = jobs;
            }
            config.validate().context("Configuration validation failed")?;
            run_synthesize(config, args).await
        }
    }
}

/// Load or create the config and apply the log level
fn load_config(common: &CommonArgs) -> Result<Config> {
    if !Path::new(&common.config_path).exists() {
        warn!("Config file not found at '{}', creating default config.", common.config_path);
    }

    let mut config = Config::load_or_create(&common.config_path)?;
    if let Some(log_level) = &common.log_level {
        config.log_level = log_level.clone().into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_parse(config: Config, script: &Path, json: bool) -> Result<()> {
    let preview_lines = config.output.preview_lines;
    let controller = Controller::with_config(config)?;
    let parsed = controller.load_script(script).await?;
    let summary = scriptvox::script::ScriptSummary::from_parsed(&parsed);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print!("{}", summary);
    for character in parsed.registry.characters() {
        println!();
        println!("{}:", character.name);
        for line in dialogue_preview(&parsed.dialogue, &character.key, preview_lines).lines() {
            println!("    {}", line);
        }
    }
    Ok(())
}

async fn run_synthesize(config: Config, args: SynthesizeArgs) -> Result<()> {
    let voices = args
        .voices
        .iter()
        .map(|arg| parse_voice_arg(arg))
        .collect::<Result<Vec<_>>>()?;
    let output_dir = args.output_dir.unwrap_or_else(|| config.output.directory.clone());

    let controller = Controller::with_config(config)?;
    let summary = controller
        .run(SynthesisRequest {
            script: args.script,
            voices,
            characters: args.characters,
            output_dir,
        })
        .await?;

    print!("{}", summary);
    if !summary.failed.is_empty() {
        warn!("{} characters could not be completed", summary.failed.len());
    }
    if let Some(report) = &summary.report_path {
        info!("Report written to {}", report.display());
    }
    Ok(())
}
