use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::header::{CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use tracing::{error, info};

use crate::check::{CheckError, CheckRequest};
use crate::server::AppState;
use crate::server::response::CheckResponse;
use crate::store::{PackageUsage, Store, StoreError};

fn header_str<'a>(headers: &'a HeaderMap, name: axum::http::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// Accepts `application/json` and `+json` media types, parameters ignored
fn is_json_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    media_type == "application/json"
        || (media_type.starts_with("application/") && media_type.ends_with("+json"))
}

/// Run a store operation on the blocking pool; SQLite waits on locks synchronously
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, StoreError>
where
    F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || op(store.as_ref())).await?
}

/// `PUT /check`
pub async fn check(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CheckResponse>, CheckError> {
    if !state
        .config
        .is_recognized_agent(header_str(&headers, USER_AGENT))
    {
        return Err(CheckError::UnauthorizedAgent);
    }

    if !is_json_content_type(header_str(&headers, CONTENT_TYPE)) {
        return Err(CheckError::ClientInput("content type must be JSON"));
    }

    let check = CheckRequest::from_json(&body)?.validate(&state.config.allowed_packages)?;
    let now = Utc::now();

    let recorded = {
        let check = check.clone();
        with_store(&state, move |store| {
            store.record_installation(&check, remote.ip(), now)
        })
        .await
    };

    match recorded {
        Ok(count) => info!(
            package = %check.package_name,
            version = %check.package_version,
            ip = %remote.ip(),
            count,
            "Check recorded"
        ),
        Err(e) => error!(
            package = %check.package_name,
            error = %e,
            "Failed to record check"
        ),
    }

    let release = state
        .resolver
        .latest(&check.package_name, check.wants_prerelease(), now)
        .await?;

    Ok(Json(CheckResponse::new(release)))
}

/// `GET /packages`
pub async fn packages(
    State(state): State<AppState>,
) -> Result<Json<Vec<PackageUsage>>, StoreError> {
    let report = with_store(&state, |store| store.packages_report(Utc::now())).await?;
    Ok(Json(report))
}

/// `GET /`
pub async fn home() -> StatusCode {
    StatusCode::NO_CONTENT
}
