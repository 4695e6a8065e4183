//! Anchor Schema CLI
//!
//! Identity maintenance, group views and export documents over domain,
//! project and deploy JSON files.
//!
//! Usage:
//!   anchor-schema uids domain model.json --write
//!   anchor-schema groups model.json
//!   anchor-schema export project project.json
//!   anchor-schema deploy-domains deploy.json

use std::fs;
use std::path::{Path, PathBuf};

use anchor_schemas::codec;
use anchor_schemas::identity;
use anchor_schemas::model::{Deploy, Domain, Project};
use anchor_schemas::{EngineConfig, SchemaSession};
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "anchor-schema")]
#[command(about = "Maintain anchor-model schema documents")]
struct Cli {
    /// Explicit configuration file, layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum RootKind {
    Domain,
    Project,
    Deploy,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign identities to every node lacking one
    Uids {
        kind: RootKind,
        file: PathBuf,
        /// Rewrite the file in place instead of printing
        #[arg(long)]
        write: bool,
    },

    /// Print the materialized groups of a domain
    Groups { file: PathBuf },

    /// Print an export document for a root
    Export { kind: RootKind, file: PathBuf },

    /// List the domain short names placed in a deployment
    DeployDomains { file: PathBuf },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration to a file
    Init {
        #[arg(default_value = "anchor-schemas.toml")]
        path: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = EngineConfig::load_from(cli.config.as_deref())?;
    let format = config.export.output_format;

    match cli.command {
        Commands::Uids { kind, file, write } => {
            let content = read(&file)?;
            let (assigned, output) = match kind {
                RootKind::Domain => {
                    let mut root = codec::decode_root::<Domain>("domain", &content)?;
                    let assigned = identity::assign_domain_uids(root.as_mut())?;
                    (assigned, codec::render(&root, format)?)
                }
                RootKind::Project => {
                    let mut root = codec::decode_root::<Project>("project", &content)?;
                    let assigned = identity::assign_project_uids(root.as_mut())?;
                    (assigned, codec::render(&root, format)?)
                }
                RootKind::Deploy => {
                    let mut root = codec::decode_root::<Deploy>("deploy", &content)?;
                    let assigned = identity::assign_deploy_uids(root.as_mut())?;
                    (assigned, codec::render(&root, format)?)
                }
            };
            if write {
                fs::write(&file, output)
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                println!("Assigned {} identifiers in {}", assigned, file.display());
            } else {
                println!("{}", output);
            }
            Ok(())
        }

        Commands::Groups { file } => {
            let session = SchemaSession::builder()
                .config(config)
                .domain_json(&read(&file)?)?
                .build()?;
            let groups = session.materialized_groups()?;
            println!("{}", session.render(&groups)?);
            Ok(())
        }

        Commands::Export { kind, file } => {
            let content = read(&file)?;
            let builder = SchemaSession::builder().config(config);
            let text = match kind {
                RootKind::Domain => {
                    let mut session = builder.domain_json(&content)?.build()?;
                    session.export_domain()?.render(format)?
                }
                RootKind::Project => {
                    let mut session = builder.project_json(&content)?.build()?;
                    session.export_project()?.render(format)?
                }
                RootKind::Deploy => {
                    let mut session = builder.deploy_json(&content)?.build()?;
                    session.export_deploy()?.render(format)?
                }
            };
            println!("{}", text);
            Ok(())
        }

        Commands::DeployDomains { file } => {
            let session = SchemaSession::builder()
                .config(config)
                .deploy_json(&read(&file)?)?
                .build()?;
            for name in session.deploy_domain_names() {
                println!("{}", name);
            }
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Init { path } => {
                EngineConfig::default()
                    .save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Wrote default configuration to {}", path.display());
                Ok(())
            }
        },
    }
}
