use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::http::Method;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderName,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use firdesk_backend::config::Config;
use firdesk_backend::db::issue_repository::IssueRepository;
use firdesk_backend::db::postgres_issue_repository::PostgresIssueRepository;
use firdesk_backend::feed::IssueFeed;
use firdesk_backend::responses::JsonResponse;
use firdesk_backend::routes::auth::{handle_login, handle_logout, handle_me};
use firdesk_backend::routes::dashboard::dashboard_handler;
use firdesk_backend::routes::issues::{
    get_issue, issue_events, list_issues, submit_issue, update_issue,
};
use firdesk_backend::services::object_store::{FsObjectStore, ObjectStore};
use firdesk_backend::state::AppState;
use firdesk_backend::utils::csrf::{get_csrf_token, validate_csrf};
use firdesk_backend::utils::jwt::JwtKeys;

#[cfg(feature = "tls")]
use axum_server::tls_rustls::RustlsConfig;

/// Submissions carry a photo; leave headroom above the 5MB image cap.
const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let rate_limit_ms: u64 = std::env::var("RATE_LIMITER_MILLISECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        // Default: 200ms/token (~5 req/sec)
        .unwrap_or(200);
    let rate_limit_burst: u32 = std::env::var("RATE_LIMITER_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        // Default: allow short bursts while dashboards poll
        .unwrap_or(20);
    let global_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(rate_limit_ms)
            .burst_size(rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Background task to cleanup old IPs
    let governor_limiter = global_governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let rate_limit_auth_s: u64 = std::env::var("RATE_LIMITER_AUTH_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1);
    let rate_limit_auth_burst: u32 = std::env::var("RATE_LIMITER_AUTH_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(10);
    // Stricter limiter for /api/auth/*
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(rate_limit_auth_s)
            .burst_size(rate_limit_auth_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    let config = Config::from_env();

    let pg_pool = establish_connection(&config.database_url).await;
    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .expect("Failed to run database migrations");

    let issue_repo = Arc::new(PostgresIssueRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn IssueRepository>;

    std::fs::create_dir_all(&config.uploads_dir).expect("Failed to create uploads directory");
    let object_store =
        Arc::new(FsObjectStore::new(&config.uploads_dir, "/files")) as Arc<dyn ObjectStore>;

    let feed = IssueFeed::new(Arc::clone(&issue_repo));
    let jwt_keys = JwtKeys::from_env().expect("Failed to load JWT keys");

    let uploads_dir = config.uploads_dir.clone();
    let frontend_origin = config.frontend_origin.clone();

    let state = AppState {
        db: issue_repo,
        object_store,
        feed,
        jwt_keys,
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(frontend_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .allow_credentials(true);

    let csrf_layer = ServiceBuilder::new().layer(axum::middleware::from_fn(validate_csrf));

    // Routes that require CSRF protection (unsafe HTTP methods)
    let csrf_protected_auth = Router::new()
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .layer(csrf_layer.clone());

    // Routes that do NOT require CSRF (safe methods)
    let unprotected_auth = Router::new()
        .route("/me", get(handle_me))
        .route("/csrf-token", get(get_csrf_token));

    let auth_routes = csrf_protected_auth
        .merge(unprotected_auth)
        .layer(GovernorLayer {
            config: auth_governor_conf.clone(),
        });

    // Issue routes: GET passes the CSRF check untouched, POST/PATCH need it
    let issue_routes = Router::new()
        .route("/", post(submit_issue).get(list_issues))
        .route("/events", get(issue_events))
        .route("/{issue_id}", get(get_issue).patch(update_issue))
        .layer(csrf_layer.clone())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    let app = Router::new()
        .route("/", get(root))
        .route("/api/dashboard", get(dashboard_handler))
        .nest("/api/auth", auth_routes)
        .nest("/api/issues", issue_routes)
        .nest_service("/files", ServeDir::new(uploads_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: global_governor_conf.clone(),
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    #[cfg(feature = "tls")]
    {
        // TLS: Only run this block when `--features tls` is used
        let tls_config = RustlsConfig::from_pem_file(
            std::env::var("DEV_CERT_LOCATION").unwrap(),
            std::env::var("DEV_KEY_LOCATION").unwrap(),
        )
        .await
        .expect("Failed to load TLS certs");

        println!("Running with TLS at https://{}", addr);
        let _ = axum_server::bind_rustls(addr, tls_config)
            .serve(make_service)
            .await;

        return; // Skip the fallback if TLS was used
    }

    let listener = TcpListener::bind(addr).await.unwrap();
    println!("Running without TLS at http://{}", addr);
    axum::serve(listener, make_service).await.unwrap();
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("FirDesk is running").into_response()
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> PgPool {
    let pool = PgPool::connect(database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .expect("Failed to verify database connection");

    info!("✅ Successfully connected to the database");
    pool
}
