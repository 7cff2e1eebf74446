use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rolemap_core::config::{Config, CONFIG_FILE};
use rolemap_core::pipeline::{AnalysisOutcome, AnalysisPipeline};
use rolemap_core::store::{CriteriaStore, JsonFileCriteriaStore, DEFAULT_OWNER};
use rolemap_core::types::{AnalysisCriteria, AnalysisMode, CriteriaRule, CriteriaType};
use rolemap_core::walker::CancelToken;
use rolemap_report::{json, markdown, text};

#[derive(Parser)]
#[command(name = "rolemap")]
#[command(about = "Classify project files into architectural roles and check structural criteria")]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project and print its structure
    Analyze {
        /// Path to the project root
        path: PathBuf,
        /// Config file path (defaults to .rolemap.toml in the project or an ancestor)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Analysis mode: structural or full-content (overrides config)
        #[arg(short, long)]
        mode: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Compact JSON output
        #[arg(long)]
        compact: bool,
    },
    /// Analyze and exit with code 0 (all criteria pass) or 1 (any fails)
    Check {
        /// Path to the project root
        path: PathBuf,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Analysis mode: structural or full-content (overrides config)
        #[arg(short, long)]
        mode: Option<String>,
        /// Criteria store to evaluate in addition to the configured criteria
        #[arg(long)]
        criteria: Option<PathBuf>,
        /// Owner whose saved criteria are evaluated
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Compact JSON output
        #[arg(long)]
        compact: bool,
    },
    /// Create a default .rolemap.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
    /// Manage saved criteria
    Criteria {
        #[command(subcommand)]
        action: CriteriaAction,
    },
}

#[derive(Subcommand)]
enum CriteriaAction {
    /// List saved criteria
    List {
        /// Criteria store file
        #[arg(long)]
        store: PathBuf,
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
        /// Print the criteria as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a criterion, replacing any with the same id
    Add {
        /// Criteria store file
        #[arg(long)]
        store: PathBuf,
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Require full-content analysis
        #[arg(long)]
        full_content: bool,
        /// Rule as property:operator:value, e.g. controllers_count:greater_than:0
        #[arg(long = "rule", required = true)]
        rules: Vec<String>,
    },
    /// Remove a saved criterion
    Remove {
        /// Criteria store file
        #[arg(long)]
        store: PathBuf,
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
        id: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Analyze {
            path,
            config,
            mode,
            format,
            compact,
        } => cmd_analyze(&path, config.as_deref(), mode.as_deref(), format, compact),
        Commands::Check {
            path,
            config,
            mode,
            criteria,
            owner,
            format,
            compact,
        } => cmd_check(
            &path,
            config.as_deref(),
            mode.as_deref(),
            criteria.as_deref(),
            &owner,
            format,
            compact,
        ),
        Commands::Init { force } => cmd_init(force),
        Commands::Criteria { action } => cmd_criteria(action),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        "rolemap=debug,rolemap_core=debug"
    } else if quiet {
        "rolemap=error,rolemap_core=error"
    } else {
        "rolemap=info,rolemap_core=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn cmd_analyze(
    path: &Path,
    config_path: Option<&Path>,
    mode: Option<&str>,
    format: OutputFormat,
    compact: bool,
) -> Result<()> {
    let config = load_config(path, config_path)?;
    let mode = resolve_mode(mode, &config)?;
    let criteria = config.criteria.clone();
    let outcome = run_analysis(path, config, mode, &criteria)?;

    let report = match format {
        OutputFormat::Text => text::format_report(&outcome),
        OutputFormat::Json => json::format_report(&outcome, compact)?,
        OutputFormat::Markdown => markdown::format_report(&outcome),
    };
    println!("{report}");

    if !outcome.structure.is_valid() {
        process::exit(2);
    }
    Ok(())
}

fn cmd_check(
    path: &Path,
    config_path: Option<&Path>,
    mode: Option<&str>,
    store_path: Option<&Path>,
    owner: &str,
    format: OutputFormat,
    compact: bool,
) -> Result<()> {
    let config = load_config(path, config_path)?;
    let mode = resolve_mode(mode, &config)?;

    let mut criteria = config.criteria.clone();
    if let Some(store_path) = store_path {
        let store = JsonFileCriteriaStore::open(store_path)
            .with_context(|| format!("failed to open criteria store '{}'", store_path.display()))?;
        criteria.extend(store.list(owner)?);
    }
    if criteria.is_empty() {
        tracing::warn!(
            "no criteria configured; add [[criteria]] to {CONFIG_FILE} or pass --criteria"
        );
    }

    let outcome = run_analysis(path, config, mode, &criteria)?;

    let (report, passed) = match format {
        OutputFormat::Text => text::format_check(&outcome),
        OutputFormat::Json => json::format_check(&outcome, compact)?,
        OutputFormat::Markdown => markdown::format_check(&outcome),
    };
    println!("{report}");

    if !outcome.structure.is_valid() {
        process::exit(2);
    }
    if !passed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn cmd_criteria(action: CriteriaAction) -> Result<()> {
    match action {
        CriteriaAction::List { store, owner, json } => {
            let store = open_store(&store)?;
            let criteria = store.list(&owner)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&criteria)?);
                return Ok(());
            }
            if criteria.is_empty() {
                println!("No criteria saved for '{owner}'.");
                return Ok(());
            }
            for c in &criteria {
                println!(
                    "{} {} ({}, {} rule(s))",
                    c.id.bold(),
                    c.name,
                    type_label(c.criteria_type),
                    c.rules.len()
                );
                for rule in &c.rules {
                    println!("  {} {} {}", rule.property, rule.operator, rule.value);
                }
            }
            Ok(())
        }
        CriteriaAction::Add {
            store,
            owner,
            id,
            name,
            description,
            full_content,
            rules,
        } => {
            let rules = rules
                .iter()
                .map(|r| parse_rule(r))
                .collect::<Result<Vec<_>>>()?;
            let criteria = AnalysisCriteria {
                id: id.clone(),
                name,
                description,
                criteria_type: if full_content {
                    CriteriaType::FullContent
                } else {
                    CriteriaType::Structural
                },
                rules,
            };
            open_store(&store)?.put(&owner, criteria)?;
            println!("Saved criterion '{id}' for '{owner}'.");
            Ok(())
        }
        CriteriaAction::Remove { store, owner, id } => {
            if open_store(&store)?.remove(&owner, &id)? {
                println!("Removed criterion '{id}'.");
                Ok(())
            } else {
                anyhow::bail!("no criterion '{id}' saved for '{owner}'")
            }
        }
    }
}

fn open_store(path: &Path) -> Result<JsonFileCriteriaStore> {
    JsonFileCriteriaStore::open(path)
        .with_context(|| format!("failed to open criteria store '{}'", path.display()))
}

fn type_label(criteria_type: CriteriaType) -> &'static str {
    match criteria_type {
        CriteriaType::Structural => "structural",
        CriteriaType::FullContent => "full content",
    }
}

/// Parse `property:operator:value`. The value may itself contain colons.
fn parse_rule(raw: &str) -> Result<CriteriaRule> {
    let mut parts = raw.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(property), Some(operator), Some(value))
            if !property.trim().is_empty() && !operator.trim().is_empty() =>
        {
            Ok(CriteriaRule {
                property: property.trim().to_string(),
                operator: operator.trim().to_string(),
                value: value.trim().to_string(),
                error_message: None,
            })
        }
        _ => anyhow::bail!("invalid rule '{raw}': expected property:operator:value"),
    }
}

fn load_config(project_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => Ok(Config::load_or_default(project_path)),
    }
}

fn resolve_mode(flag: Option<&str>, config: &Config) -> Result<AnalysisMode> {
    match flag {
        Some(m) => m.parse(),
        None => Ok(config.analysis.mode),
    }
}

fn run_analysis(
    project_path: &Path,
    config: Config,
    mode: AnalysisMode,
    criteria: &[AnalysisCriteria],
) -> Result<AnalysisOutcome> {
    let pipeline = AnalysisPipeline::new(config)?;
    let path = project_path.to_string_lossy();
    let mut outcome = pipeline.run(&path, mode, criteria, &CancelToken::new());
    // file text is only needed during classification
    outcome.structure.strip_content();
    Ok(outcome)
}
