//! Request routing
//!
//! Matches method and path, percent-decodes the `{mode}` and `{address}`
//! segments and reads the body before dispatching to a handler.

use std::error::Error as StdError;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, StatusCode};
use serde_json::json;
use tracing::debug;

use crate::body::BodyError;
use crate::context::ApiContext;
use crate::handlers::{self, ConsentRequest};
use crate::response::{error_response, json_response, ApiResponse};

/// Flow selected by a consent route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Accept,
    Cancel,
    List,
}

/// Dispatches one request
pub async fn route<B>(ctx: &ApiContext, req: Request<B>) -> ApiResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let path = parts.uri.path();
    debug!(method = %parts.method, path = %path, "Request received");

    if path == "/healthz" {
        return if parts.method == Method::GET {
            json_response(StatusCode::OK, &json!({ "status": "ok" }))
        } else {
            not_found()
        };
    }

    let Some((flow, mode, address)) = match_consent_route(&parts.method, path) else {
        return not_found();
    };

    let body = match flow {
        Flow::List => Ok(Bytes::new()),
        Flow::Accept | Flow::Cancel => read_body(body, ctx.max_body_bytes).await,
    };
    let req = ConsentRequest {
        mode: &mode,
        address: &address,
        headers: &parts.headers,
        body,
    };

    match flow {
        Flow::Accept => handlers::accept(ctx, req).await,
        Flow::Cancel => handlers::cancel(ctx, req).await,
        Flow::List => handlers::list(ctx, req).await,
    }
}

fn not_found() -> ApiResponse {
    error_response(StatusCode::NOT_FOUND, "not found")
}

/// Buffers the body, refusing anything larger than `limit` bytes
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, BodyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            debug!(limit, "Request body over limit");
            Err(BodyError::Read(format!("body exceeds {} bytes", limit)))
        }
        Err(e) => Err(BodyError::Read(e.to_string())),
    }
}

/// Splits `/v1/consent/{mode}/{address}[/cancel]` into its flow and
/// decoded segments
fn match_consent_route(method: &Method, path: &str) -> Option<(Flow, String, String)> {
    let rest = path.strip_prefix("/v1/consent/")?;
    let segments: Vec<&str> = rest.split('/').collect();

    let (flow, mode, address) = match segments.as_slice() {
        [mode, address] if *method == Method::POST => (Flow::Accept, mode, address),
        [mode, address, "cancel"] if *method == Method::POST => (Flow::Cancel, mode, address),
        [mode, address] if *method == Method::DELETE => (Flow::Cancel, mode, address),
        [mode, address] if *method == Method::GET => (Flow::List, mode, address),
        _ => return None,
    };

    let mode = decode_segment(mode);
    let address = decode_segment(address);
    if mode.is_empty() || address.is_empty() {
        return None;
    }
    Some((flow, mode, address))
}

/// Percent-decodes one path segment
///
/// `+`, `&` and `=` are literal in a path, so they are escaped before the
/// segment goes through the form decoder.
fn decode_segment(raw: &str) -> String {
    let escaped = raw
        .replace('+', "%2B")
        .replace('&', "%26")
        .replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}
