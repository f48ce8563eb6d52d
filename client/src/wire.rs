//! JSON bodies of the lookup service endpoints.

use serde::{Deserialize, Serialize};

/// `GET /start/{imei}` success body.
#[derive(Debug, Deserialize)]
pub(crate) struct StartResponse {
    pub(crate) captcha_image: String,
    pub(crate) session_id: String,
}

/// `POST /solve` request body.
#[derive(Debug, Serialize)]
pub(crate) struct SolveRequest<'a> {
    pub(crate) session_id: &'a str,
    pub(crate) captcha_text: &'a str,
}

/// `POST /solve` success body.
#[derive(Debug, Deserialize)]
pub(crate) struct SolveResponse {
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) message: String,
}

/// Pull the user-facing message out of an error body.
///
/// Handles `{"detail": "..."}` and the list form
/// `{"detail": [{"msg": "..."}, ...]}` produced for request validation
/// failures. Returns `None` for anything else, including non-JSON bodies.
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let payload: serde_json::Value = serde_json::from_str(body).ok()?;
    match payload.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Array(entries) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|entry| entry.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{SolveRequest, SolveResponse, StartResponse, extract_detail};

    #[test]
    fn detail_string() {
        assert_eq!(
            extract_detail(r#"{"detail":"rate limited"}"#),
            Some("rate limited".to_string())
        );
    }

    #[test]
    fn detail_validation_list() {
        let body = r#"{"detail":[{"loc":["body","captcha_text"],"msg":"field required","type":"value_error.missing"},{"msg":"too short"}]}"#;
        assert_eq!(
            extract_detail(body),
            Some("field required; too short".to_string())
        );
    }

    #[test]
    fn detail_missing_or_unusable() {
        assert_eq!(extract_detail("Internal Server Error"), None);
        assert_eq!(extract_detail(r#"{"error":"x"}"#), None);
        assert_eq!(extract_detail(r#"{"detail":42}"#), None);
        assert_eq!(extract_detail(r#"{"detail":[]}"#), None);
        assert_eq!(extract_detail(""), None);
    }

    #[test]
    fn solve_response_message_defaults_to_empty() {
        let body: SolveResponse = serde_json::from_str(r#"{"status":"clean"}"#).unwrap();
        assert_eq!(body.status, "clean");
        assert!(body.message.is_empty());
    }

    #[test]
    fn start_response_requires_both_fields() {
        assert!(serde_json::from_str::<StartResponse>(r#"{"session_id":"abc"}"#).is_err());
        let body: StartResponse =
            serde_json::from_str(r#"{"session_id":"abc","captcha_image":"data:,"}"#).unwrap();
        assert_eq!(body.session_id, "abc");
    }

    #[test]
    fn solve_request_field_names() {
        let json = serde_json::to_value(SolveRequest {
            session_id: "abc123",
            captcha_text: "XYZ9",
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"session_id": "abc123", "captcha_text": "XYZ9"})
        );
    }
}
