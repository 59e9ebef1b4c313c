//! grid-bridge: serves configured grids over HTTP, opens one in a desktop
//! window, or imports a CSV file into the grid database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use grid_bridge::config::{default_config_path, default_db_path, GridsConfig};
use grid_bridge::infra::http::server;
use grid_bridge::infra::registry::build_registry;
use grid_bridge::infra::sqlite::schema::seed_demo;
use grid_bridge::usecase::services::grid_registry::GridRegistry;
use grid_bridge::usecase::services::import_service::ImportService;

#[derive(Parser)]
#[command(name = "grid-bridge", version, about = "Remote data grids over SQLite")]
struct Cli {
    /// Grid declarations (TOML). Without one the built-in demo grid is used.
    #[arg(short, long, env = "GRID_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file.
    #[arg(long, env = "GRID_BRIDGE_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the data protocol over HTTP.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Open a grid in a desktop window.
    #[cfg(feature = "desktop")]
    Desktop {
        /// Grid to show; defaults to the first one.
        #[arg(long)]
        grid: Option<String>,
        /// Fetch from a running `serve` instance instead of the local database.
        #[arg(long)]
        url: Option<String>,
    },
    /// Load a CSV file into a new table.
    Import {
        #[arg(long)]
        table: String,
        #[arg(long)]
        csv: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Serve { bind } => {
            let (config, registry) = open_registry(&cli)?;
            let bind = bind
                .clone()
                .unwrap_or_else(|| config.bind_addr().to_string());
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime.block_on(server::serve(registry, &bind))
        }
        #[cfg(feature = "desktop")]
        Command::Desktop { grid, url } => {
            let context = match url {
                Some(url) => remote_viewer(url, grid.clone())?,
                None => {
                    let (_, registry) = open_registry(&cli)?;
                    local_viewer(registry, grid.clone())?
                }
            };
            launch_desktop(context)
        }
        Command::Import { table, csv } => {
            let db_path = match &cli.db {
                Some(path) => path.clone(),
                None => default_db_path()?,
            };
            let result = ImportService::new(db_path).import_csv(csv, table)?;
            info!(
                table = %result.table,
                columns = ?result.columns,
                "import finished"
            );
            Ok(())
        }
    }
}

/// Loads the grid config (explicit, default location, or the demo) and
/// wires every grid to the database.
fn open_registry(cli: &Cli) -> Result<(GridsConfig, Arc<GridRegistry>)> {
    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => default_config_path().ok().filter(|path| path.exists()),
    };

    let (config, demo) = match config_path {
        Some(path) => {
            info!(config = %path.display(), "loading grid config");
            (GridsConfig::load(&path)?, false)
        }
        None => {
            info!("no grid config found, using the demo grid");
            (GridsConfig::demo(), true)
        }
    };

    let db_path = match (&cli.db, &config.database) {
        (Some(path), _) | (None, Some(path)) => path.clone(),
        (None, None) => default_db_path()?,
    };
    if demo {
        seed_demo(&db_path)?;
    }
    info!(db = %db_path.display(), "using database");

    let registry = build_registry(&config, &db_path)?;
    Ok((config, Arc::new(registry)))
}

#[cfg(feature = "desktop")]
fn local_viewer(
    registry: Arc<GridRegistry>,
    grid: Option<String>,
) -> Result<grid_bridge::ui::grid_view::ViewerContext> {
    use grid_bridge::client::transport::InProcessTransport;
    use grid_bridge::ui::grid_view::ViewerContext;

    let grid = match grid {
        Some(grid) => grid,
        None => registry
            .names()
            .into_iter()
            .next()
            .context("no grids configured")?,
    };
    let definition = registry.definition(&grid)?.clone();
    Ok(ViewerContext {
        definition,
        transport: Arc::new(InProcessTransport::new(registry, grid)),
    })
}

#[cfg(feature = "desktop")]
fn remote_viewer(
    url: &str,
    grid: Option<String>,
) -> Result<grid_bridge::ui::grid_view::ViewerContext> {
    use grid_bridge::client::transport::HttpTransport;
    use grid_bridge::ui::grid_view::ViewerContext;

    let grid = match grid {
        Some(grid) => grid,
        None => HttpTransport::grid_names(url)?
            .into_iter()
            .next()
            .with_context(|| format!("{url} serves no grids"))?,
    };
    let transport = HttpTransport::new(url, grid)?;
    let definition = transport
        .definition()
        .with_context(|| format!("failed to load grid `{}` from {url}", transport.grid()))?;
    info!(%url, grid = %definition.name, "using remote grid");
    Ok(ViewerContext {
        definition,
        transport: Arc::new(transport),
    })
}

#[cfg(feature = "desktop")]
fn launch_desktop(context: grid_bridge::ui::grid_view::ViewerContext) -> Result<()> {
    use grid_bridge::config::default_webview_dir;
    use grid_bridge::ui::grid_view::GridApp;

    let grid = context.definition.name.clone();
    let webview_dir = default_webview_dir()?;

    info!(%grid, "opening desktop viewer");
    dioxus::LaunchBuilder::desktop()
        .with_cfg(
            dioxus::desktop::Config::new()
                .with_window(
                    dioxus::desktop::WindowBuilder::new()
                        .with_title(format!("grid-bridge: {grid}")),
                )
                .with_data_directory(webview_dir),
        )
        .with_context(context)
        .launch(GridApp);
    Ok(())
}
