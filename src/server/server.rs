use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::difficulty::DifficultyEstimator;
use crate::piece_store::PieceStore;
use crate::user::{AuthTokenValue, User, UserManager};
use axum_extra::extract::cookie::{Cookie, SameSite};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::pieces::make_pieces_routes;
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::{log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub user_handle: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

#[derive(Serialize)]
struct SessionResponse {
    user: User,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(stats)
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    debug!("login() called for {}", body.user_handle);
    match user_manager.login(&body.user_handle, &body.password) {
        Ok(Some(auth_token)) => {
            let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, auth_token.value.0.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (
                StatusCode::CREATED,
                [(header::SET_COOKIE, cookie.to_string())],
                Json(LoginSuccessResponse {
                    token: auth_token.value.0,
                }),
            )
                .into_response()
        }
        Ok(None) => StatusCode::FORBIDDEN.into_response(),
        Err(err) => {
            error!("Error with auth token generation: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    match user_manager.logout(&AuthTokenValue(session.token)) {
        Ok(_) => {
            let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
                .same_site(SameSite::Lax)
                .build();
            (StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]).into_response()
        }
        Err(err) => {
            error!("Failed to delete auth token: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_session(session: Session) -> impl IntoResponse {
    Json(SessionResponse { user: session.user })
}

pub fn make_app(
    config: ServerConfig,
    piece_store: Arc<dyn PieceStore>,
    user_manager: Arc<UserManager>,
    difficulty_estimator: Option<Arc<dyn DifficultyEstimator>>,
) -> Router {
    let state = ServerState::new(
        config.clone(),
        piece_store,
        user_manager,
        difficulty_estimator,
    );

    let auth_routes: Router = Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/session", post(get_session))
        .with_state(state.clone());

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let mut app: Router = home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/pieces", make_pieces_routes(state.clone()));

    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));
    if config.cors_allow_any_origin {
        app = app.layer(CorsLayer::permissive());
    }

    app
}

pub async fn run_server(
    config: ServerConfig,
    piece_store: Arc<dyn PieceStore>,
    user_manager: Arc<UserManager>,
    difficulty_estimator: Option<Arc<dyn DifficultyEstimator>>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, piece_store, user_manager, difficulty_estimator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
