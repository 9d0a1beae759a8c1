//! The HTTP surface around the engine: OAuth login flow, rebuild trigger,
//! liveness.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tokio::sync::{mpsc, Mutex};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use tweetledger_common::{Config, UserToken};
use tweetledger_ingest::traits::CredentialStore;
use tweetledger_ingest::Trigger;
use twitter_client::{Keypair, RequestToken, TwitterClient};

pub struct AppState {
    pub config: Config,
    pub credentials: Arc<dyn CredentialStore>,
    pub triggers: mpsc::Sender<Trigger>,
    /// Request-token secrets awaiting their callback, keyed by token.
    pub pending_logins: Mutex<HashMap<String, String>>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/oauth_callback", get(oauth_callback))
        .route("/rebuild", post(rebuild))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn twitter(config: &Config) -> TwitterClient {
    TwitterClient::new(Keypair::new(
        config.twitter_api_key.clone(),
        config.twitter_api_key_secret.clone(),
    ))
}

async fn login(State(state): State<Arc<AppState>>) -> Response {
    let client = twitter(&state.config);
    match client.request_token(&state.config.oauth_callback_url).await {
        Ok(request) => {
            let authorize = client.authorize_url(&request.token);
            state
                .pending_logins
                .lock()
                .await
                .insert(request.token, request.secret);
            Redirect::temporary(&authorize).into_response()
        }
        Err(e) => {
            error!("failed to obtain request token: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start login: {e}\n"),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
struct CallbackParams {
    oauth_token: String,
    oauth_verifier: String,
}

async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(secret) = state
        .pending_logins
        .lock()
        .await
        .remove(&params.oauth_token)
    else {
        return (
            StatusCode::BAD_REQUEST,
            "Unknown or expired login attempt\n".to_string(),
        )
            .into_response();
    };

    let client = twitter(&state.config);
    let request = RequestToken {
        token: params.oauth_token,
        secret,
    };
    let access = match client.access_token(&request, &params.oauth_verifier).await {
        Ok(access) => access,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("Failed to get access token: {e}\n"),
            )
                .into_response();
        }
    };

    // Only the bot account may install its token.
    if access.user_id != state.config.bot_user_id {
        warn!(user_id = %access.user_id, "rejected login from non-bot identity");
        return (
            StatusCode::UNAUTHORIZED,
            format!("Unauthorized user {}\n", access.user_id),
        )
            .into_response();
    }

    let token = UserToken {
        token: access.token,
        secret: access.secret,
    };
    if let Err(e) = state.credentials.store_user_token(&token).await {
        error!("failed to store credentials: {e:#}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to store credentials: {e}\n"),
        )
            .into_response();
    }
    info!(screen_name = %access.screen_name, "stored user token");
    "OK\n".into_response()
}

async fn rebuild(State(state): State<Arc<AppState>>) -> Response {
    match state.triggers.send(Trigger::Rebuild).await {
        Ok(()) => "ok\n".into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "control loop is not running\n".to_string(),
        )
            .into_response(),
    }
}

async fn healthz() -> &'static str {
    "ok\n"
}
