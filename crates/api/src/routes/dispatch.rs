//! Per-service dispatch.
//!
//! One coordinating task per request: parse body, authenticate, route by
//! the path segment, wrap whatever comes back in the envelope. Domain
//! failures ride inside a 200 envelope with `success=false`; only body,
//! auth, and routing failures use non-200 status codes. Every dispatched
//! operation runs under the configured request deadline; elapse becomes a
//! terminal `Unavailable` envelope rather than a hung connection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tides_core::{PreferencesUpdate, Timeframe};
use tides_domain::{boundaries, EnergyInput, FlowType, ReportFormat, TidesError};
use tracing::{debug, warn};

use crate::auth;
use crate::context::AppContext;
use crate::envelope::Envelope;

enum DispatchError {
    UnknownService,
    Domain(TidesError),
}

impl From<TidesError> for DispatchError {
    fn from(err: TidesError) -> Self {
        Self::Domain(err)
    }
}

type DispatchResult = Result<Value, DispatchError>;

pub async fn handle(
    State(ctx): State<Arc<AppContext>>,
    Path(service): Path<String>,
    body: Bytes,
) -> Response {
    let started = Instant::now();

    if body.is_empty() {
        return coordinator_error(StatusCode::BAD_REQUEST, "Request body is required");
    }
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return coordinator_error(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"));
        }
    };

    let identity = match auth::authenticate(&ctx.config.auth, &payload) {
        Ok(identity) => identity,
        Err(rejection) => {
            return coordinator_error(StatusCode::UNAUTHORIZED, rejection.message);
        }
    };

    debug!(service, owner = identity.owner.as_str(), "dispatching service request");
    let deadline = Duration::from_secs(ctx.config.server.request_timeout_seconds);
    let outcome = tokio::time::timeout(deadline, route(&ctx, &service, &identity.owner, &payload))
        .await
        .unwrap_or_else(|_| {
            Err(DispatchError::Domain(TidesError::Unavailable(format!(
                "request timed out after {}s",
                deadline.as_secs()
            ))))
        });

    match outcome {
        Ok(data) => Json(Envelope::success(&service, started, data)).into_response(),
        Err(DispatchError::UnknownService) => coordinator_error(
            StatusCode::NOT_FOUND,
            format!("service '{service}' not found"),
        ),
        Err(DispatchError::Domain(err)) => {
            warn!(service, owner = identity.owner.as_str(), error = %err, "service request failed");
            Json(Envelope::failure(&service, started, &err)).into_response()
        }
    }
}

async fn route(ctx: &AppContext, service: &str, owner: &str, payload: &Value) -> DispatchResult {
    match service {
        "insights" => insights(ctx, owner, payload).await,
        "optimize" => optimize(ctx, owner, payload).await,
        "questions" => questions(ctx, owner, payload).await,
        "preferences" => preferences(ctx, owner, payload).await,
        "create-tide" => create_tide(ctx, owner, payload).await,
        "end-tide" => end_tide(ctx, owner, payload).await,
        "delete-tide" => delete_tide(ctx, owner, payload).await,
        "add-session" => add_session(ctx, owner, payload).await,
        "add-energy" => add_energy(ctx, owner, payload).await,
        "link-task" => link_task(ctx, owner, payload).await,
        "report" => report(ctx, owner, payload).await,
        "switch-context" => switch_context(ctx, owner, payload).await,
        "list-contexts" => list_contexts(ctx, owner, payload).await,
        _ => Err(DispatchError::UnknownService),
    }
}

async fn insights(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let raw = optional_str(payload, "timeframe").unwrap_or_else(|| "daily".to_string());
    let timeframe = Timeframe::parse(&raw).ok_or_else(|| {
        TidesError::Validation(format!(
            "timeframe must be one of daily, weekly, monthly (got '{raw}')"
        ))
    })?;
    let date = request_date(payload)?;
    let answer = ctx.assist.insights(owner, timeframe, date).await?;
    Ok(json!({"timeframe": raw, "insights": answer}))
}

async fn optimize(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let date = request_date(payload)?;
    let answer = ctx.assist.optimize(owner, date).await?;
    Ok(json!({"suggestions": answer}))
}

async fn questions(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let question = require_str(payload, "question")?;
    let date = request_date(payload)?;
    let answer = ctx.assist.question(owner, &question, date).await?;
    Ok(json!({"answer": answer}))
}

/// Read when the body carries no `update` object; partial update otherwise.
async fn preferences(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let prefs = match payload.get("update") {
        Some(update) => {
            let update: PreferencesUpdate = serde_json::from_value(update.clone())
                .map_err(|e| TidesError::Validation(format!("invalid preferences update: {e}")))?;
            ctx.preferences.update(owner, update).await?
        }
        None => ctx.preferences.get(owner).await?,
    };
    to_json(&prefs)
}

async fn create_tide(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let name = require_str(payload, "name")?;
    let flow_type = require_str(payload, "flow_type")?;
    let description = optional_str(payload, "description");
    let date = optional_date(payload)?;
    let tide = ctx.tides.create_tide(owner, &name, &flow_type, description, date).await?;
    to_json(&tide)
}

async fn end_tide(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let tide_id = require_str(payload, "tide_id")?;
    let closing_summary = optional_str(payload, "closing_summary");
    let tide = ctx.tides.end_tide(owner, &tide_id, closing_summary).await?;
    to_json(&tide)
}

/// Owner-initiated purge: the tide and every child record are hard-deleted.
async fn delete_tide(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let tide_id = require_str(payload, "tide_id")?;
    ctx.tides.delete_tide(owner, &tide_id).await?;
    Ok(json!({"deleted": tide_id}))
}

async fn add_session(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let tide_id = require_str(payload, "tide_id")?;
    let intensity = optional_str(payload, "intensity");
    let duration = optional_u32(payload, "duration_minutes")?;
    let initial_energy = optional_str(payload, "initial_energy");
    let work_context = optional_str(payload, "work_context");
    let session = ctx
        .tides
        .add_flow_session(owner, &tide_id, intensity.as_deref(), duration, initial_energy, work_context)
        .await?;
    to_json(&session)
}

async fn add_energy(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let tide_id = require_str(payload, "tide_id")?;
    let energy = payload
        .get("energy")
        .cloned()
        .ok_or_else(|| TidesError::Validation("energy is required".into()))?;
    let input: EnergyInput = serde_json::from_value(energy).map_err(|_| {
        TidesError::Validation("energy must be a number or a level label".into())
    })?;
    let context = optional_str(payload, "context");
    let timezone = optional_str(payload, "timezone");
    let sample = ctx.tides.add_energy_sample(owner, &tide_id, &input, context, timezone).await?;
    to_json(&sample)
}

async fn link_task(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let tide_id = require_str(payload, "tide_id")?;
    let task_url = require_str(payload, "task_url")?;
    let task_title = require_str(payload, "task_title")?;
    let task_type = optional_str(payload, "task_type");
    let link = ctx.tides.link_task(owner, &tide_id, &task_url, &task_title, task_type).await?;
    to_json(&link)
}

async fn report(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let tide_id = require_str(payload, "tide_id")?;
    let format = match optional_str(payload, "format") {
        Some(raw) => ReportFormat::parse(&raw).ok_or_else(|| {
            TidesError::Validation(format!(
                "format must be one of json, text, table (got '{raw}')"
            ))
        })?,
        None => ReportFormat::default(),
    };
    Ok(ctx.tides.generate_report(owner, &tide_id, format).await?)
}

async fn switch_context(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let raw = require_str(payload, "context_type")?;
    let context_type = FlowType::parse(&raw).ok_or_else(|| {
        TidesError::Validation(format!(
            "context_type must be one of daily, weekly, monthly, project, seasonal (got '{raw}')"
        ))
    })?;
    let date = request_date(payload)?;
    let tide = ctx.contexts.switch_context(owner, context_type, date).await?;
    to_json(&tide)
}

async fn list_contexts(ctx: &AppContext, owner: &str, payload: &Value) -> DispatchResult {
    let date = request_date(payload)?;
    let snapshot = ctx.contexts.list_contexts(owner, date).await?;
    to_json(&snapshot)
}

fn coordinator_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

fn require_str(payload: &Value, field: &str) -> Result<String, TidesError> {
    optional_str(payload, field)
        .ok_or_else(|| TidesError::Validation(format!("{field} is required")))
}

fn optional_str(payload: &Value, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn optional_u32(payload: &Value, field: &str) -> Result<Option<u32>, TidesError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                TidesError::Validation(format!("{field} must be a non-negative integer"))
            }),
    }
}

/// The `date` field, defaulting to today (UTC) when absent.
fn request_date(payload: &Value) -> Result<NaiveDate, TidesError> {
    Ok(optional_date(payload)?.unwrap_or_else(|| Utc::now().date_naive()))
}

fn optional_date(payload: &Value) -> Result<Option<NaiveDate>, TidesError> {
    match payload.get("date").and_then(Value::as_str) {
        Some(raw) => Ok(Some(boundaries::parse_canonical(raw)?)),
        None => Ok(None),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> DispatchResult {
    serde_json::to_value(value)
        .map_err(|e| DispatchError::Domain(TidesError::Internal(format!("serialization failed: {e}"))))
}
