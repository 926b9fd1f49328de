//! Consent request handlers
//!
//! Each handler opens an audit session first, runs its flow, and submits
//! the session before the response leaves. Failures are folded into a
//! [`Rejection`] so the audit result and the error body always agree.

use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{HeaderMap, StatusCode};
use optin_audit::{AuditSession, ReasonCode};
use optin_core::domain::{
    AccessMode, AuditAction, Brief, ConsentError, ConsentRecord, ConsentStatus, SubjectToken,
};
use optin_core::usecases::require_token;
use serde_json::json;
use tracing::debug;

use crate::body::{decode_consent_body, BodyError, ConsentBody};
use crate::context::ApiContext;
use crate::response::{json_response, ok, with_cors, ApiResponse, Rejection, MSG_MISSING_BRIEF};

/// Path parameters and payload of a consent request
pub struct ConsentRequest<'a> {
    pub mode: &'a str,
    pub address: &'a str,
    pub headers: &'a HeaderMap,
    pub body: Result<Bytes, BodyError>,
}

// ============================================================================
// Accept
// ============================================================================

/// Records a consent decision for the addressed subject
///
/// Unresolved subjects are still recorded, keyed by their address.
pub async fn accept(ctx: &ApiContext, req: ConsentRequest<'_>) -> ApiResponse {
    let mode = AccessMode::parse(req.mode);
    let mut audit = ctx
        .audit
        .begin(AuditAction::ConsentAccept, mode.clone(), req.address);

    let outcome = accept_flow(ctx, &mode, &req, &mut audit).await;
    let response = finish(&mut audit, outcome, |()| ok());
    audit.submit().await;

    match response {
        Err(_) if ctx.silent_accept_failures => ok(),
        Err(rejection) => rejection.to_response(),
        Ok(response) => response,
    }
}

async fn accept_flow(
    ctx: &ApiContext,
    mode: &AccessMode,
    req: &ConsentRequest<'_>,
    audit: &mut AuditSession,
) -> Result<(), ConsentError> {
    let resolution = ctx.resolver.resolve(mode, req.address).await?;
    match resolution.token() {
        Some(token) => audit.set_subject(*token),
        None => audit.annotate("resolution", ReasonCode::SubjectNotFound.to_string()),
    }

    let body = decode(req)?;
    let brief = required_brief(&body)?;
    audit.annotate("brief", brief.as_str());

    let record = ConsentRecord::new(
        resolution.token().copied(),
        mode.clone(),
        req.address,
        brief,
        body.message,
        body.status.map(ConsentStatus::new),
    );
    audit.annotate("status", record.status().as_str());

    ctx.ledger
        .create_or_update(&record)
        .await
        .map_err(|e| ConsentError::Storage(e.to_string()))
}

// ============================================================================
// Cancel
// ============================================================================

/// Marks the subject's consent for a brief as cancelled
pub async fn cancel(ctx: &ApiContext, req: ConsentRequest<'_>) -> ApiResponse {
    let mode = AccessMode::parse(req.mode);
    let mut audit = ctx
        .audit
        .begin(AuditAction::ConsentCancel, mode, req.address);

    let outcome = cancel_flow(ctx, &req, &mut audit).await;
    let response = finish(&mut audit, outcome, |()| ok());
    audit.submit().await;

    response.unwrap_or_else(|rejection| rejection.to_response())
}

async fn cancel_flow(
    ctx: &ApiContext,
    req: &ConsentRequest<'_>,
    audit: &mut AuditSession,
) -> Result<(), ConsentError> {
    let token = require_token(req.address)?;
    audit.set_subject(token);
    authorize(ctx, req.headers, &token).await?;

    let body = decode(req)?;
    let brief = required_brief(&body)?;
    audit.annotate("brief", brief.as_str());

    ctx.ledger
        .cancel(&token, &brief)
        .await
        .map_err(|e| ConsentError::Storage(e.to_string()))
}

// ============================================================================
// List
// ============================================================================

/// Returns every consent record of the subject
pub async fn list(ctx: &ApiContext, req: ConsentRequest<'_>) -> ApiResponse {
    let mode = AccessMode::parse(req.mode);
    let mut audit = ctx.audit.begin(AuditAction::ConsentList, mode, req.address);

    let outcome = list_flow(ctx, &req, &mut audit).await;
    let response = finish(&mut audit, outcome, |rows| {
        let body = json!({ "status": "ok", "total": rows.len(), "rows": rows });
        with_cors(json_response(StatusCode::OK, &body))
    });
    audit.submit().await;

    response.unwrap_or_else(|rejection| rejection.to_response())
}

async fn list_flow(
    ctx: &ApiContext,
    req: &ConsentRequest<'_>,
    audit: &mut AuditSession,
) -> Result<Vec<ConsentRecord>, ConsentError> {
    let token = require_token(req.address)?;
    audit.set_subject(token);
    authorize(ctx, req.headers, &token).await?;

    let rows = ctx
        .ledger
        .list(&token)
        .await
        .map_err(|e| ConsentError::Storage(e.to_string()))?;
    audit.annotate("total", rows.len());
    Ok(rows)
}

// ============================================================================
// Shared steps
// ============================================================================

/// Records the outcome on the audit session and shapes the response
fn finish<T>(
    audit: &mut AuditSession,
    outcome: Result<T, ConsentError>,
    on_success: impl FnOnce(T) -> ApiResponse,
) -> Result<ApiResponse, Rejection> {
    match outcome {
        Ok(value) => Ok(on_success(value)),
        Err(err) => {
            let rejection = Rejection::from(&err);
            debug!(error = %err, status = %rejection.status, "Consent request rejected");
            audit.fail(rejection.reason, err.to_string());
            Err(rejection)
        }
    }
}

async fn authorize(
    ctx: &ApiContext,
    headers: &HeaderMap,
    token: &SubjectToken,
) -> Result<(), ConsentError> {
    let presented = headers
        .get(ctx.auth_header.as_str())
        .and_then(|v| v.to_str().ok());
    ctx.auth
        .authorize(presented, token)
        .await
        .map_err(|e| ConsentError::Auth(e.to_string()))
}

fn decode(req: &ConsentRequest<'_>) -> Result<ConsentBody, ConsentError> {
    let bytes = req
        .body
        .as_ref()
        .map_err(|e| ConsentError::Body(e.to_string()))?;
    let content_type = req
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    decode_consent_body(content_type, bytes).map_err(|e| ConsentError::Body(e.to_string()))
}

fn required_brief(body: &ConsentBody) -> Result<Brief, ConsentError> {
    body.brief()
        .and_then(|b| Brief::new(b).ok())
        .ok_or_else(|| ConsentError::Validation(MSG_MISSING_BRIEF.to_string()))
}
