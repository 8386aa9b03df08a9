pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod services;
pub mod state;
pub mod types;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post, put};
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{protected, public};
pub use crate::state::AppState;

/// The full HTTP surface over `state`
pub fn app(state: AppState) -> Router {
    let config = config::config();

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(auth_routes())
        .merge(client_routes())
        .merge(job_card_routes())
        .merge(ticket_routes())
        .merge(technician_routes())
        .merge(admin_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn cors_layer() -> CorsLayer {
    if is_development!() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config::config()
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}

fn public_routes() -> Router<AppState> {
    use public::portal;

    Router::new()
        .route("/api/auth/login", post(public::auth::login))
        .route("/api/public/support/:access_token", get(portal::support_get).post(portal::support_post))
        .route(
            "/api/public/log-maintenance/:unique_id",
            get(portal::maintenance_get).post(portal::maintenance_post),
        )
        .route("/api/public/client-asset/:unique_id", get(portal::client_asset_get))
        .route("/api/public/history/:unique_id", get(portal::history_get))
        .route("/api/public/job-card/:unique_id", get(portal::job_card_get).put(portal::job_card_put))
}

fn auth_routes() -> Router<AppState> {
    Router::new().route("/api/auth/whoami", get(protected::auth::whoami))
}

fn client_routes() -> Router<AppState> {
    use protected::{client_children, clients};

    Router::new()
        .route("/api/clients", get(clients::list).post(clients::post))
        .route("/api/clients/:id", get(clients::get).put(clients::put).delete(clients::delete))
        .route("/api/clients/:id/restore", post(clients::restore))
        .route("/api/clients/:id/access-token", post(clients::regenerate_token))
        // sites, assets, contacts, documents, notes, service-agreements
        .route("/api/clients/:id/:kind", get(client_children::list).post(client_children::post))
        .route(
            "/api/clients/:id/:kind/:item_id",
            get(client_children::get)
                .put(client_children::put)
                .delete(client_children::delete),
        )
}

fn job_card_routes() -> Router<AppState> {
    use protected::job_cards;

    Router::new()
        .route("/api/job-cards", get(job_cards::list).post(job_cards::post))
        .route("/api/job-cards/:id", get(job_cards::get).put(job_cards::put).delete(job_cards::delete))
        .route("/api/job-cards/:id/:child", get(job_cards::child_list).post(job_cards::child_post))
        .route(
            "/api/job-cards/:id/:child/:child_id",
            put(job_cards::child_put).delete(job_cards::child_delete),
        )
}

fn ticket_routes() -> Router<AppState> {
    use protected::support_tickets as tickets;

    Router::new()
        .route("/api/support-tickets", get(tickets::list).post(tickets::post))
        .route("/api/support-tickets/:id", get(tickets::get).put(tickets::put).delete(tickets::delete))
        .route("/api/support-tickets/:id/:child", get(tickets::child_list).post(tickets::child_post))
        .route(
            "/api/support-tickets/:id/:child/:child_id",
            put(tickets::child_put).delete(tickets::child_delete),
        )
}

fn technician_routes() -> Router<AppState> {
    use axum::routing::delete;
    use protected::technicians;

    Router::new()
        .route("/api/technicians", get(technicians::list).post(technicians::post))
        .route(
            "/api/technicians/:id",
            get(technicians::get).put(technicians::put).delete(technicians::delete),
        )
        .route(
            "/api/technicians/:id/insurance",
            get(technicians::insurance_list).post(technicians::insurance_post),
        )
        .route("/api/technicians/:id/insurance/:item_id", delete(technicians::insurance_delete))
        .route("/api/technicians/:id/tags", get(technicians::tags_list).post(technicians::tags_post))
        .route("/api/technicians/:id/tags/:item_id", delete(technicians::tags_delete))
}

fn admin_routes() -> Router<AppState> {
    use protected::{resources, settings, users};

    Router::new()
        .route("/api/users", get(users::list).post(users::post))
        .route("/api/users/:id", get(users::get).put(users::put).delete(users::delete))
        .route("/api/resources", get(resources::resources_list).post(resources::resources_post))
        .route(
            "/api/resources/:id",
            get(resources::resources_get)
                .put(resources::resources_put)
                .delete(resources::resources_delete),
        )
        .route("/api/checklists", get(resources::checklists_list).post(resources::checklists_post))
        .route(
            "/api/checklists/:id",
            get(resources::checklists_get)
                .put(resources::checklists_put)
                .delete(resources::checklists_delete),
        )
        .route("/api/settings", get(settings::get).put(settings::put))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Total Spray Care API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health (public)",
                "auth": "/api/auth/login (public), /api/auth/whoami (protected)",
                "public": "/api/public/* (access token or unique id in the path)",
                "clients": "/api/clients[/:id[/:kind[/:item_id]]] (protected)",
                "job_cards": "/api/job-cards[/:id[/:child[/:child_id]]] (protected)",
                "support_tickets": "/api/support-tickets[/:id[/:child[/:child_id]]] (protected)",
                "technicians": "/api/technicians (staff)",
                "users": "/api/users (staff)",
                "library": "/api/resources, /api/checklists, /api/settings (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
