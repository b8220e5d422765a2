use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use cocoa::analysis::JavaAnalysis;
use cocoa::config::{resolve_config_path, ConfigStore, ToolboxSettings};
use cocoa::context::AnalysisContext;
use cocoa::errors::{CocoaError, Result};
use cocoa::mcp::{build_registry, McpServer, ToolDefinition};

/// Java code analysis exposed as MCP tools.
#[derive(Parser)]
#[command(name = "cocoa", version, about = "Java code analysis exposed as MCP tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the analysis tools over MCP on stdio
    Toolbox {
        /// Root of the Java project to analyze
        #[arg(short, long)]
        project_path: PathBuf,
        /// Config file (default: $COCOA_CONFIG, then the user config dir)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the registered operations
    Tools {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Toolbox {
            project_path,
            config,
        } => {
            let store = match resolve_config_path(config.as_deref()) {
                Some(path) => ConfigStore::load(&path)?,
                None => ConfigStore::empty(),
            };
            let settings = ToolboxSettings::from_store(&store)?;
            let project_root = project_path.canonicalize().map_err(|e| CocoaError::Config {
                message: format!("cannot open project '{}': {}", project_path.display(), e),
            })?;

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async move {
                let registry = Arc::new(build_registry()?);
                let context = Arc::new(AnalysisContext::new(project_root));
                let server = Arc::new(McpServer::new(registry, context));
                server.start_initialization(move |root| JavaAnalysis::load(root, &settings));
                server.run().await
            })?;
        }
        Commands::Tools { json } => {
            let registry = build_registry()?;
            if json {
                let tools: Vec<ToolDefinition> =
                    registry.list().into_iter().map(ToolDefinition::from).collect();
                println!("{}", serde_json::to_string_pretty(&tools)?);
            } else {
                for descriptor in registry.list() {
                    let params: Vec<String> = descriptor
                        .params
                        .iter()
                        .map(|p| {
                            if p.required {
                                p.name.to_string()
                            } else {
                                format!("[{}]", p.name)
                            }
                        })
                        .collect();
                    println!("{}({})", descriptor.name, params.join(", "));
                    println!("  {}", descriptor.description);
                }
                println!("\n{} operations", registry.len());
            }
        }
    }
    Ok(())
}
