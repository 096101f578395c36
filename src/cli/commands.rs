use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::AppConfig;
use crate::echo::{echo_page, EchoProcedure};
use crate::error::ConfigError;
use crate::router::CompositeRouter;
use crate::server::{AppService, HttpServer};
use crate::servers::{ApiServer, FileServer, SubServer, TemplateServer};

/// Command-line interface for switchyard
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Serve file routes, template pages and typed API procedures on one port", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mount everything in a config file and serve it
    Serve {
        /// Path to the YAML configuration file
        #[arg(short, long, env = "SWITCHYARD_CONFIG")]
        config: PathBuf,

        /// Address and port to bind, overriding `server.addr`
        #[arg(long)]
        addr: Option<String>,
    },
    /// Run every registration step for a config file, then exit
    Check {
        /// Path to the YAML configuration file
        #[arg(short, long, env = "SWITCHYARD_CONFIG")]
        config: PathBuf,
    },
}

/// Build the router described by `config`.
///
/// File routes are registered first, then the API route, then pages, so a catch-all
/// page route such as `/` never shadows the others. Every page listed in
/// `pages.page_layouts` is served by [`echo_page`]; the API route serves the `echo`
/// procedure.
pub fn build_router(config: &AppConfig) -> Result<CompositeRouter, ConfigError> {
    let mut router = CompositeRouter::new();

    for file in &config.files {
        router.register(Arc::new(FileServer::new(&file.route, &file.dir)?));
    }

    if let Some(api) = &config.api {
        let mut server = ApiServer::json(&api.route)?;
        server.register("echo", EchoProcedure)?;
        router.register(Arc::new(server));
    }

    if let Some(pages) = &config.pages {
        let mut server = TemplateServer::new(pages.clone())?;
        for layout in &pages.page_layouts {
            server.register_page(&layout.path, layout.route_method()?, echo_page)?;
        }
        router.register(Arc::new(server));
    }

    Ok(router)
}

fn load(config: &Path) -> anyhow::Result<(AppConfig, CompositeRouter)> {
    let app = AppConfig::load(config)
        .with_context(|| format!("failed to load config {}", config.display()))?;
    let router = build_router(&app)
        .with_context(|| format!("failed to mount routes from {}", config.display()))?;
    Ok((app, router))
}

pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { config, addr } => {
            let (app, router) = load(&config)?;
            let addr = addr.unwrap_or_else(|| app.server.addr.clone());
            let service = AppService::new(Arc::new(router), app.server.timeout());
            info!(addr = %addr, config = %config.display(), "Starting switchyard");
            let handle = HttpServer(service)
                .start(addr.as_str())
                .with_context(|| format!("failed to bind {addr}"))?;
            handle
                .join()
                .map_err(|e| anyhow!("server coroutine panicked: {e:?}"))?;
            Ok(())
        }
        Commands::Check { config } => {
            let (_, router) = load(&config)?;
            for server in router.servers() {
                println!("{:<6} {}", server.kind(), server.pattern());
            }
            println!("✅ {} is valid", config.display());
            Ok(())
        }
    }
}
