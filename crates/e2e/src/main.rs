//! media-e2e - drag-and-drop verification runner
//!
//! Exit status: 0 when every scenario passed, 1 when any failed or gave
//! inconsistent verdicts across repeats, 2 when the harness could not run.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use media_e2e::playwright::{Browser, PlaywrightHandle};
use media_e2e::runner::{self, ScenarioRunner, SuiteReport};
use media_e2e::server::AppServer;
use media_e2e::{scenario, HarnessConfig, ScenarioSpec};

#[derive(Parser, Debug)]
#[command(name = "media-e2e")]
#[command(author, version, about = "Drag-and-drop verification for the media library UI")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "media-e2e.toml", global = true)]
    config: PathBuf,

    /// Base URL of the application
    #[arg(long, env = "MEDIA_E2E_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Admin credential submitted by authenticate steps
    #[arg(long, env = "MEDIA_E2E_ADMIN_TOKEN", hide_env_values = true, global = true)]
    admin_token: Option<String>,

    /// Browser to use
    #[arg(long, value_enum, global = true)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// Directory of YAML scenarios
    #[arg(long, global = true)]
    specs: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run scenarios and report verdicts
    Run {
        /// Run only these scenarios
        #[arg(short, long = "scenario")]
        scenarios: Vec<String>,

        /// Run scenarios with this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Run each scenario this many times in fresh contexts
        #[arg(long, default_value = "1")]
        repeat: usize,

        /// Output format for verdicts
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output directory for the JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not start or health-check the application
        #[arg(long)]
        no_server: bool,
    },

    /// List available scenarios
    List,

    /// Print the generated Playwright script for a scenario
    Script {
        name: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// SUCCESS / FAILURE lines
    #[default]
    Text,
    /// The full suite report
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            return ExitCode::from(2);
        }
    };

    match rt.block_on(async_main(cli)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn async_main(cli: Cli) -> anyhow::Result<u8> {
    let config = load_config(&cli)?;
    let available = available_scenarios(&config)?;

    match cli.command {
        Commands::List => {
            for spec in &available {
                println!("{:<32} [{}] {}", spec.name, spec.tags.join(","), spec.description);
            }
            Ok(0)
        }
        Commands::Script { name } => {
            let spec = available
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| media_e2e::E2eError::ScenarioNotFound(name.clone()))?;
            println!("{}", config.playwright.build_script(spec, &config.admin_credential)?);
            Ok(0)
        }
        Commands::Run {
            scenarios,
            tag,
            repeat,
            format,
            output,
            no_server,
        } => {
            let defaults = if config.default_scenarios.is_empty() {
                scenario::default_names(&available)
            } else {
                config.default_scenarios.clone()
            };
            let selected = runner::select(available, &defaults, &scenarios, tag.as_deref())?;
            if selected.is_empty() {
                anyhow::bail!("no scenarios selected");
            }

            let _app = if no_server {
                None
            } else {
                Some(AppServer::start(&config.app, &config.playwright.base_url).await?)
            };

            let handle = PlaywrightHandle::new(config.playwright.clone())?;
            let runner = ScenarioRunner::new(handle, config.playwright.clone(), config.admin_credential.clone());
            let report = runner.run_suite(&selected, repeat).await;

            print_report(&report, format)?;
            report.write_json(&output.unwrap_or_else(|| config.output_dir.clone()))?;

            Ok(report.exit_code() as u8)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<HarnessConfig> {
    let mut config = HarnessConfig::load(&cli.config)?;

    if let Some(url) = &cli.base_url {
        config.playwright.base_url = url.clone();
    }
    if let Some(token) = &cli.admin_token {
        config.admin_credential = token.clone();
    }
    if let Some(browser) = cli.browser {
        config.playwright.browser = browser;
    }
    if cli.headed {
        config.playwright.headless = false;
    }
    if let Some(dir) = &cli.specs {
        config.specs_dir = Some(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Built-ins first, then YAML scenarios; a YAML scenario replaces a
/// built-in of the same name. Also returns the YAML scenario names.
fn available_scenarios(config: &HarnessConfig) -> anyhow::Result<Vec<ScenarioSpec>> {
    let mut specs = scenario::builtin();
    if let Some(dir) = &config.specs_dir {
        for spec in ScenarioSpec::load_all(dir)? {
            specs.retain(|s| s.name != spec.name);
            specs.push(spec);
        }
    }
    Ok(specs)
}

fn print_report(report: &SuiteReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for verdict in &report.results {
                if report.repeat > 1 {
                    println!("[{} #{}]", verdict.scenario, verdict.run);
                } else {
                    println!("[{}]", verdict.scenario);
                }
                for line in &verdict.report {
                    println!("{}", line);
                }
                println!("{}", verdict.summary_line());
            }
            for name in &report.inconsistent {
                println!("FAILURE: {} gave different verdicts across runs", name);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }
    Ok(())
}
