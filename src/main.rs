use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "katana-builders")]
#[command(version, about = "Classify, filter and sort Katana builders")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Codebase parameter of the main repository. Overrides builders.toml and
    /// KATANA_MAIN_CODEBASE.
    #[arg(long, global = true)]
    pub main_codebase: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Page location shared by the snapshot commands.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct PageArgs {
    /// Page query string, e.g. "unity_branch=trunk&tag=ABV"
    #[arg(long, default_value = "")]
    pub query: String,

    /// CODEBASE=BRANCH pair; repeat for more codebases
    #[arg(long = "codebase", value_name = "CODEBASE=BRANCH")]
    pub codebases: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the branch type for a page location
    Branch {
        #[command(flatten)]
        page: PageArgs,

        /// Builder snapshot whose branch tags confirm the match
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// List the selectable tags of a snapshot
    Tags {
        #[arg(long)]
        snapshot: PathBuf,

        #[command(flatten)]
        page: PageArgs,

        /// Print the tag widget payload instead of one tag per line
        #[arg(long)]
        json: bool,
    },
    /// Print the visible builders of a snapshot
    Filter {
        #[arg(long)]
        snapshot: PathBuf,

        #[command(flatten)]
        page: PageArgs,

        /// Comma-separated tag selection, as the tag widget reports it
        #[arg(long)]
        tags: Option<String>,

        #[arg(long)]
        search: Option<String>,

        /// Toggle hiding unstable builders
        #[arg(long)]
        hide_unstable: bool,

        /// Sort key COLUMN[:asc|desc]; repeat for secondary keys
        #[arg(long = "sort", value_name = "COLUMN[:DIR]")]
        sort: Vec<String>,

        #[arg(long)]
        json: bool,

        /// Also print the page query after the edits
        #[arg(long)]
        print_url: bool,
    },
    /// Sort values with a named comparator
    Sort {
        #[arg(long = "type", default_value = "natural")]
        sort_type: String,

        #[arg(long)]
        desc: bool,

        values: Vec<String>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    Show,
    Validate,
    Init,
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.with_ansi(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Branch { page, snapshot } => {
            cmd::cmd_branch(&cli, &project_dir, page, snapshot.as_deref())?
        }
        Commands::Tags {
            snapshot,
            page,
            json,
        } => cmd::cmd_tags(&cli, &project_dir, snapshot, page, *json)?,
        Commands::Filter {
            snapshot,
            page,
            tags,
            search,
            hide_unstable,
            sort,
            json,
            print_url,
        } => {
            let edits = cmd::FilterEdits {
                tags: tags.clone(),
                search: search.clone(),
                toggle_hide_unstable: *hide_unstable,
            };
            cmd::cmd_filter(
                &cli,
                &project_dir,
                snapshot,
                page,
                &edits,
                sort,
                *json,
                *print_url,
            )?
        }
        Commands::Sort {
            sort_type,
            desc,
            values,
        } => cmd::cmd_sort(sort_type, *desc, values)?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
