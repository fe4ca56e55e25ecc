use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::aggregate::AggregateMaintainer;
use crate::auth::hasher::{Argon2Hasher, CredentialHasher};
use crate::auth::{JwtIssuer, TokenIssuer};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::repository::Repository;
use crate::database::store::{Collection, RecordStore};
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::services::Geocoder;

/// Everything a request needs, shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RecordStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub tokens: Arc<dyn TokenIssuer>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn RecordStore>, geocoder: Arc<dyn Geocoder>) -> Self {
        let tokens = Arc::new(JwtIssuer::new(&config.security));
        Self {
            config: Arc::new(config),
            store,
            geocoder,
            hasher: Arc::new(Argon2Hasher),
            tokens,
        }
    }

    pub fn repository(&self, collection: Collection) -> Repository {
        Repository::new(collection, self.store.clone())
    }

    pub fn aggregates(&self) -> AggregateMaintainer {
        AggregateMaintainer::new(self.store.clone())
    }
}

/// Full router: service info at the root, the API under `/api/v1`.
pub fn app(state: AppState) -> Router {
    let security = state.config.security.clone();

    let mut router = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .nest("/api/v1", api_routes(state.clone()))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if security.enable_cors {
        router = router.layer(cors_layer(&security));
    }
    router
}

fn api_routes(state: AppState) -> Router<AppState> {
    public_routes().merge(protected_routes(state))
}

/// Reads and credential exchange; no token needed.
fn public_routes() -> Router<AppState> {
    use handlers::{auth, bootcamps, courses, reviews};

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/bootcamps", get(bootcamps::list))
        .route("/bootcamps/:id", get(bootcamps::get))
        .route("/bootcamps/radius/:zipcode/:distance", get(bootcamps::radius))
        .route("/bootcamps/:id/courses", get(courses::list_for_bootcamp))
        .route("/bootcamps/:id/reviews", get(reviews::list_for_bootcamp))
        .route("/courses", get(courses::list))
        .route("/courses/:id", get(courses::get))
        .route("/reviews", get(reviews::list))
        .route("/reviews/:id", get(reviews::get))
}

/// Writes, `me` and user administration; a valid bearer token is required.
fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::{auth, bootcamps, courses, reviews, users};

    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/updatedetails", axum::routing::put(auth::update_details))
        .route("/auth/updatepassword", axum::routing::put(auth::update_password))
        .route("/bootcamps", post(bootcamps::create))
        .route("/bootcamps/:id", axum::routing::put(bootcamps::update).delete(bootcamps::delete))
        .route("/bootcamps/:id/courses", post(courses::create))
        .route("/bootcamps/:id/reviews", post(reviews::create))
        .route("/courses/:id", axum::routing::put(courses::update).delete(courses::delete))
        .route("/reviews/:id", axum::routing::put(reviews::update).delete(reviews::delete))
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id", get(users::get).put(users::update).delete(users::delete))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Serve the API on an already bound listener until the process stops.
pub async fn run(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(
        "Bootcamp API listening on http://{} ({} store, {:?})",
        addr,
        state.store.backend(),
        state.config.environment
    );
    axum::serve(listener, app(state)).await
}
