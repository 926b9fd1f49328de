//! Consent request body decoding
//!
//! Bodies arrive either as JSON objects or as
//! `application/x-www-form-urlencoded` forms. Only string values are taken
//! from JSON; a number or object under `brief` counts as absent.

use hyper::body::Bytes;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Errors that can occur while decoding a request body
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body could not be read from the connection
    #[error("failed to read body: {0}")]
    Read(String),

    /// The body is not valid JSON for a consent request
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// The content type is neither JSON nor a form
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}

/// Fields a consent request may carry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConsentBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub brief: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
}

impl ConsentBody {
    /// The brief code, if present and non-empty
    pub fn brief(&self) -> Option<&str> {
        self.brief.as_deref().filter(|b| !b.is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Text(String),
    Other(IgnoredAny),
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Lenient>::deserialize(deserializer)? {
        Some(Lenient::Text(s)) => Some(s),
        Some(Lenient::Other(_)) | None => None,
    })
}

/// Decodes a consent body according to its content type
///
/// A missing content type is treated as JSON. An empty body decodes to an
/// empty `ConsentBody`.
///
/// # Errors
///
/// Returns `BodyError::Json` for malformed JSON or a scalar document and
/// `BodyError::UnsupportedContentType` for anything other than JSON or a form.
pub fn decode_consent_body(
    content_type: Option<&str>,
    body: &Bytes,
) -> Result<ConsentBody, BodyError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ConsentBody::default());
    }

    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match media_type.as_str() {
        "" | "application/json" | "text/json" => Ok(serde_json::from_slice(body)?),
        "application/x-www-form-urlencoded" => Ok(decode_form(body)),
        other => Err(BodyError::UnsupportedContentType(other.to_string())),
    }
}

fn decode_form(body: &[u8]) -> ConsentBody {
    let mut decoded = ConsentBody::default();
    for (key, value) in url::form_urlencoded::parse(body) {
        let slot = match key.as_ref() {
            "brief" => &mut decoded.brief,
            "message" => &mut decoded.message,
            "status" => &mut decoded.status,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(ct: Option<&str>, body: &str) -> Result<ConsentBody, BodyError> {
        decode_consent_body(ct, &Bytes::from(body.to_string()))
    }

    #[test]
    fn test_json_body() {
        let body = decode(
            Some("application/json; charset=utf-8"),
            r#"{"brief":"newsletter","message":"Weekly","status":"pending"}"#,
        )
        .unwrap();
        assert_eq!(body.brief(), Some("newsletter"));
        assert_eq!(body.message.as_deref(), Some("Weekly"));
        assert_eq!(body.status.as_deref(), Some("pending"));
    }

    #[test]
    fn test_missing_content_type_is_json() {
        let body = decode(None, r#"{"brief":"sms"}"#).unwrap();
        assert_eq!(body.brief(), Some("sms"));
    }

    #[test]
    fn test_non_string_values_are_ignored() {
        let body = decode(
            None,
            r#"{"brief":42,"message":{"a":1},"status":null,"extra":[1]}"#,
        )
        .unwrap();
        assert_eq!(body, ConsentBody::default());
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(decode(None, "").unwrap(), ConsentBody::default());
        assert_eq!(
            decode(Some("application/x-www-form-urlencoded"), "  ").unwrap(),
            ConsentBody::default()
        );
    }

    #[test]
    fn test_empty_brief_is_absent() {
        let body = decode(None, r#"{"brief":""}"#).unwrap();
        assert_eq!(body.brief(), None);
    }

    #[test]
    fn test_form_body() {
        let body = decode(
            Some("application/x-www-form-urlencoded"),
            "brief=news+letter&message=caf%C3%A9&brief=ignored",
        )
        .unwrap();
        assert_eq!(body.brief(), Some("news letter"));
        assert_eq!(body.message.as_deref(), Some("café"));
        assert!(body.status.is_none());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(decode(None, "{brief"), Err(BodyError::Json(_))));
        assert!(matches!(decode(None, r#""brief""#), Err(BodyError::Json(_))));
    }

    #[test]
    fn test_unsupported_content_type() {
        let err = decode(Some("text/plain"), "brief").unwrap_err();
        assert!(matches!(err, BodyError::UnsupportedContentType(ref ct) if ct == "text/plain"));
    }
}
