//! nlframe CLI
//!
//! Host-side demo surface for the code synthesis engine:
//! - Lifting utterances and grounding templates
//! - Listing the action catalog
//! - Resolving ranked classifier candidates for an utterance
//! - Configuring, refining and rendering one operation against a workspace
//! - Inspecting the past-action memory

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use nlframe_codegen::{
    remembered_values, suggestions, ActionCatalog, Axis, Candidate, CandidateResolver,
    EngineConfig, RefinerSession, Resolution, Workspace,
};
use nlframe_dsl::{Combiner, EntityLifter, EntitySet, Literal};
use nlframe_storage::{PastActionStore, StoreConfig};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "nlframe")]
#[command(author, version, about = "nlframe: DSL actions to dataframe code")]
struct Cli {
    /// Engine configuration (JSON). Defaults apply to missing fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lift literal entities out of an utterance.
    Lift {
        text: String,
    },

    /// Ground a template with an entity set.
    Combine {
        template: String,
        /// Entity set as JSON, e.g. `{"values": ["name", "state"]}`.
        #[arg(long)]
        entities: String,
    },

    /// List the templates of the action catalog.
    Actions,

    /// Resolve ranked classifier candidates for an utterance.
    Resolve {
        #[arg(long)]
        utterance: String,
        /// JSON list of `{utterance, template, probability}`.
        #[arg(long)]
        candidates: PathBuf,
        /// Workspace JSON (datasets and their labels).
        #[arg(long)]
        workspace: PathBuf,
    },

    /// Configure an operation and print the generated code.
    Render {
        #[arg(long)]
        template: String,
        #[arg(long, default_value = "")]
        utterance: String,
        #[arg(long)]
        workspace: PathBuf,
        /// Run against this dataset instead of the one the labels point to.
        #[arg(long)]
        dataset: Option<String>,
        /// `index` or `columns`.
        #[arg(long)]
        axis: Option<String>,
        /// Parameter edits, `name=value`.
        #[arg(long = "set", value_name = "NAME=VALUE")]
        sets: Vec<String>,
        /// Restrict the operation to a column (or a `[...]` list of columns).
        #[arg(long)]
        scope: Option<String>,
        /// Past-action store used for suggestions and updated on success.
        #[arg(long)]
        memory: Option<PathBuf>,
        /// Print the full session snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Inspect or edit the past-action memory.
    Memory {
        #[arg(long, default_value = "./past_actions.json")]
        path: PathBuf,
        #[command(subcommand)]
        command: MemoryCommands,
    },
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// Print every remembered value.
    Show,
    /// Remember `name=value` pairs.
    Set {
        #[arg(value_name = "NAME=VALUE", required = true)]
        items: Vec<String>,
    },
    /// Forget one key.
    Delete { key: String },
    /// Forget everything.
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Lift { text } => cmd_lift(&text),
        Commands::Combine { template, entities } => cmd_combine(&template, &entities),
        Commands::Actions => {
            for template in ActionCatalog::new().templates() {
                println!("{template}");
            }
            Ok(())
        }
        Commands::Resolve {
            utterance,
            candidates,
            workspace,
        } => cmd_resolve(config, &utterance, &candidates, &workspace),
        Commands::Render {
            template,
            utterance,
            workspace,
            dataset,
            axis,
            sets,
            scope,
            memory,
            json,
        } => cmd_render(
            config,
            RenderArgs {
                template: &template,
                utterance: &utterance,
                workspace: &workspace,
                dataset: dataset.as_deref(),
                axis: axis.as_deref(),
                sets: &sets,
                scope: scope.as_deref(),
                memory: memory.as_deref(),
                json,
            },
        ),
        Commands::Memory { path, command } => cmd_memory(&path, command),
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn split_assignment(item: &str) -> Result<(&str, &str)> {
    item.split_once('=')
        .map(|(k, v)| (k.trim(), v))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got `{item}`"))
}

// ============================================================================
// lift / combine
// ============================================================================

fn cmd_lift(text: &str) -> Result<()> {
    let (lifted, entities) = EntityLifter::new().lift(text);
    println!("{} {}", "lifted:".green().bold(), lifted);
    println!("{}", serde_json::to_string_pretty(&entities)?);
    Ok(())
}

fn cmd_combine(template: &str, entities: &str) -> Result<()> {
    let entities: EntitySet =
        serde_json::from_str(entities).context("parsing --entities as an entity set")?;
    let combination = Combiner::new().recombine(template, &entities)?;
    println!("{} {}", "grounded:".green().bold(), combination.grounded);
    println!("{} {}", "lifted:".green().bold(), combination.lifted);
    println!("{}", serde_json::to_string_pretty(&combination.entities)?);
    Ok(())
}

// ============================================================================
// resolve
// ============================================================================

fn cmd_resolve(
    config: EngineConfig,
    utterance: &str,
    candidates: &Path,
    workspace: &Path,
) -> Result<()> {
    let candidates: Vec<Candidate> = read_json(candidates)?;
    let workspace: Workspace = read_json(workspace)?;

    match CandidateResolver::new(config).resolve(utterance, &candidates, &workspace) {
        Resolution::NotSure { marker } => {
            println!("{}", marker.yellow().bold());
        }
        Resolution::Candidates { candidates } => {
            for (rank, c) in candidates.iter().enumerate() {
                println!(
                    "{} {} {}",
                    format!("{}.", rank + 1).bold(),
                    c.grounded.green(),
                    format!("({:.2}%)", c.probability).dimmed()
                );
                println!(
                    "   {} {}  {}",
                    "→".yellow(),
                    c.descriptor.operation,
                    c.documentation.dimmed()
                );
            }
        }
    }
    Ok(())
}

// ============================================================================
// render
// ============================================================================

struct RenderArgs<'a> {
    template: &'a str,
    utterance: &'a str,
    workspace: &'a Path,
    dataset: Option<&'a str>,
    axis: Option<&'a str>,
    sets: &'a [String],
    scope: Option<&'a str>,
    memory: Option<&'a Path>,
    json: bool,
}

fn cmd_render(config: EngineConfig, args: RenderArgs<'_>) -> Result<()> {
    let workspace: Workspace = read_json(args.workspace)?;

    let lifter = EntityLifter::new();
    let (_, mut entities) = lifter.lift(args.utterance);
    let (template, embedded) = lifter.lift(args.template);
    entities.merge(&embedded);
    let combination = Combiner::new().recombine(&template, &entities)?;

    let descriptor = ActionCatalog::new().resolve(&template, &combination.entities);
    if !descriptor.is_implemented() {
        bail!("template `{template}` has no operation");
    }

    let mut session = RefinerSession::new(config);
    session.select_in(descriptor, &workspace)?;
    if let Some(name) = args.dataset {
        session.switch_dataset(&workspace, name)?;
    }

    if let Some(axis) = args.axis {
        let axis = Axis::from_literal(&Literal::str(axis))
            .ok_or_else(|| anyhow!("axis must be `index` or `columns`, got `{axis}`"))?;
        session.set_axis(axis)?;
    }
    if let Some(scope) = args.scope {
        session.set_scope(Literal::from_user_text(scope))?;
    }
    for item in args.sets {
        let (name, value) = split_assignment(item)?;
        session
            .set_parameter_text(name, value)
            .with_context(|| format!("setting `{name}`"))?;
    }

    let store = args
        .memory
        .map(|path| PastActionStore::open(StoreConfig::at(path)))
        .transpose()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    } else {
        println!("{}", session.code().green().bold());
        for warning in session.warnings() {
            eprintln!("{} {}", "warning:".yellow().bold(), warning);
        }
        if let Some(store) = &store {
            for s in suggestions(&session, store, &workspace) {
                eprintln!(
                    "{} {} = {}",
                    "suggestion:".cyan().bold(),
                    s.parameter,
                    s.value.to_python()
                );
            }
        }
    }

    let code = session.finalize()?;
    tracing::debug!(code = %code, "finalized");
    if let Some(store) = &store {
        store.save(remembered_values(&session))?;
    }
    Ok(())
}

// ============================================================================
// memory
// ============================================================================

fn cmd_memory(path: &Path, command: MemoryCommands) -> Result<()> {
    let store = PastActionStore::open(StoreConfig::at(path))?;
    match command {
        MemoryCommands::Show => {
            if store.is_empty() {
                println!("{}", "no past actions".dimmed());
            }
            for (key, entry) in store.entries() {
                println!(
                    "{} = {} {}",
                    key.bold(),
                    entry.value.to_python(),
                    entry.updated_at.to_rfc3339().dimmed()
                );
            }
        }
        MemoryCommands::Set { items } => {
            let mut parsed = Vec::with_capacity(items.len());
            for item in &items {
                let (key, value) = split_assignment(item)?;
                parsed.push((key.to_string(), Literal::from_user_text(value)));
            }
            store.save(parsed)?;
            eprintln!("{} {}", "saved".green().bold(), store.path().display());
        }
        MemoryCommands::Delete { key } => {
            if !store.delete(&key)? {
                eprintln!("{} no entry `{key}`", "info:".yellow().bold());
            }
        }
        MemoryCommands::Reset => {
            store.reset()?;
            eprintln!("{} {}", "reset".green().bold(), store.path().display());
        }
    }
    Ok(())
}
