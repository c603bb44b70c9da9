//! `countCollection`: document count for one of the app's collections.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::response::Response;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::{AppError, AppResult};

use super::{parse_body, require_post, respond, AppState};

pub const COUNTABLE_COLLECTIONS: &[&str] = &["users", "recipes", "events", "groups", "restaurants"];

#[derive(Debug, Default, Deserialize)]
struct CountPayload {
    collection: Option<String>,
}

pub async fn count_collection(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    respond(count_collection_inner(&state, &method, &body).await)
}

async fn count_collection_inner(state: &AppState, method: &Method, body: &Bytes) -> AppResult<Value> {
    require_post(method)?;
    let p: CountPayload = parse_body(body);
    let collection = match p.collection.as_deref().map(str::trim) {
        Some(c) if COUNTABLE_COLLECTIONS.contains(&c) => c.to_string(),
        _ => {
            let msg = format!("Missing or invalid collection. Use one of: {}", COUNTABLE_COLLECTIONS.join(", "));
            return Err(AppError::user("invalid_collection".to_string(), msg));
        }
    };
    match state.store.count(&collection).await {
        Ok(count) => {
            info!(target: "functions", %collection, count, "countCollection ok");
            Ok(json!({ "success": true, "collection": collection, "count": count }))
        }
        Err(e) => {
            error!(target: "functions", %collection, error = %e, "countCollection failed");
            Err(AppError::internal("count_failed", "Failed to count documents").with_details(Value::String(e.to_string())))
        }
    }
}
