//! devagent UI server - web interface for generating, browsing and downloading
//! projects.

mod routes;
mod run;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use devagent::io::config::{DEFAULT_CONFIG_PATH, load_config, load_dotenv};

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "devagent-ui")]
#[command(about = "Web UI for generating projects with devagent")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Project directory (config and output paths are relative to it)
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Config file, relative to the project directory
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serve static UI files from this directory instead of the embedded page
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("devagent_ui=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let project_dir = args.project_dir.canonicalize().unwrap_or(args.project_dir);
    let config = load_config(&project_dir.join(&args.config))?;
    load_dotenv();
    let output_dir = project_dir.join(&config.output_dir);
    info!(
        project_dir = %project_dir.display(),
        output_dir = %output_dir.display(),
        model = %config.model.model,
        "starting devagent-ui"
    );

    let state = AppState::new(config, output_dir, AppState::openai_factory());

    sse::start_file_watcher(state.clone());

    let app = app(state, args.ui_dir.as_deref());

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Full router: API, SSE and either the embedded page or a static UI dir.
fn app(state: AppState, ui_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .route("/events", get(sse::events_handler));

    match ui_dir.filter(|dir| dir.exists()) {
        Some(dir) => {
            info!(ui_dir = %dir.display(), "serving static UI files");
            app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
        }
        None => {
            app = app.route("/", get(routes::index));
        }
    }

    app.layer(cors).with_state(state)
}
