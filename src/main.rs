use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand};
use meshfind::config::{AppConfig, get_config_path};
use meshfind::graph::MemoryGraph;
use meshfind::output::{self, GraphView};
use meshfind::query::{AutoComplete, OPERANDS, compile};
use meshfind::session::{Session, Slot};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshfind")]
#[command(about = "Find and hide elements of a service-mesh topology graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// More logging (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an expression and show its selector form
    Check {
        /// Expression words
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        expression: Vec<String>,
    },
    /// Apply find/hide expressions to a graph file
    View {
        /// Graph JSON file ({"elements": {"nodes": [..], "edges": [..]}})
        #[arg(short, long)]
        graph: PathBuf,

        /// Find expression
        #[arg(short, long)]
        find: Option<String>,

        /// Hide expression
        #[arg(long)]
        hide: Option<String>,

        /// Remove hidden elements instead of making them invisible
        #[arg(long, conflicts_with = "no_compress")]
        compress: bool,

        /// Make hidden elements invisible instead of removing them
        #[arg(long)]
        no_compress: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List operands, or complete a partial expression
    Operands {
        /// Text to complete
        prefix: Option<String>,
    },
    /// Show the effective configuration
    Config {
        /// Also write it to the config file, filling in defaults
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let color = config.color && !cli.no_color;

    match cli.command {
        Commands::Check { expression } => {
            let text = expression.join(" ");
            let query = compile(&text)?;
            output::print_query(query.as_ref(), color)?;
        }
        Commands::View {
            graph,
            find,
            hide,
            compress,
            no_compress,
            json,
        } => {
            let mut graph = MemoryGraph::from_file(&graph)?;
            let mut session = Session::new(&config);

            if compress || no_compress {
                session.set_compress_on_hide(compress, &mut graph);
            }
            if let Some(text) = &find {
                session
                    .submit(Slot::Find, text, &mut graph)
                    .map_err(|e| anyhow!("{}: {e}", Slot::Find))?;
            }
            if let Some(text) = &hide {
                session
                    .submit(Slot::Hide, text, &mut graph)
                    .map_err(|e| anyhow!("{}: {e}", Slot::Hide))?;
            }

            let view = GraphView::build(&graph, &session);
            if json {
                output::print_view_json(&view)?;
            } else {
                output::print_view(&view, color)?;
            }
        }
        Commands::Operands { prefix } => match prefix {
            Some(prefix) => {
                let mut completer = AutoComplete::new(OPERANDS);
                completer.set_root(&prefix);
                output::print_operands(completer.candidates())?;
            }
            None => output::print_operands(OPERANDS.iter().copied())?,
        },
        Commands::Config { save } => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => get_config_path()?,
            };
            if save {
                config.save_to(&path)?;
            }
            let content = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
            println!("# {}", path.display());
            println!("{content}");
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
