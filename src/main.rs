use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use study_planner::api::user::{self, SharedPlanner};
use study_planner::catalog::CatalogClient;
use study_planner::config::Config;
use study_planner::planner::Planner;
use study_planner::store::{self, SqlitePlanStore};
use study_planner::transcript::TranscriptService;
use study_planner::utils::init_log;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the planner database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[arg(short = 'H', long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(OpenApi)]
#[openapi(paths(
    study_planner::api::user::create_user,
    study_planner::api::user::login,
    study_planner::api::user::logout,
    study_planner::api::user::user_info,
    study_planner::api::user::submit_link,
    study_planner::api::user::save_plan,
    study_planner::api::user::today,
    study_planner::api::user::overview,
    study_planner::api::user::mark_watched,
    study_planner::api::user::view_day,
    study_planner::api::user::reset_progress,
    study_planner::api::user::delete_plan,
    study_planner::api::user::day_material,
))]
struct PlannerApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let _guard = init_log(None);
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let database = args.database.unwrap_or(config.database);
    let host = args.host.unwrap_or(config.host);
    let port = args.port.unwrap_or(config.port);

    let options = SqliteConnectOptions::new()
        .filename(&database)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    store::init_schema(&pool).await?;

    let session_store = SqliteStore::new(pool.clone());
    session_store.migrate().await?;
    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(5)));

    let youtube_api_key = dotenvy::var("YOUTUBE_API_KEY")?;
    let planner: SharedPlanner = Arc::new(Planner::new(
        pool.clone(),
        SqlitePlanStore::new(pool),
        CatalogClient::new(youtube_api_key),
        TranscriptService::new()?,
    ));

    let api = Router::new()
        .nest("/api", user::get_planner_scope())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(std::time::Duration::from_secs(120)))
                .layer(session_layer),
        )
        .with_state(planner);
    let app = api.merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", PlannerApiDoc::openapi()),
    );

    let listener = TcpListener::bind((host.as_str(), port)).await?;
    info!("planner server listening on {}", listener.local_addr()?);
    info!("swagger ui available at http://{host}:{port}/swagger-ui/");
    axum::serve(listener, app).await?;

    Ok(())
}
