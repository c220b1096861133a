//! Extracting image bytes from a `generateContent` response.
//!
//! Lookup order: an inline binary part in any candidate, then a
//! `data:image/...;base64,` URL in the text, then a bare base64 run of at
//! least [`MIN_BARE_BASE64_LEN`] characters that decodes cleanly.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use serde_json::Value;

use super::GenerationError;

/// Shortest bare base64 run treated as image data.
pub const MIN_BARE_BASE64_LEN: usize = 256;

fn data_url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"data:image/[A-Za-z0-9.+-]+;base64,([A-Za-z0-9+/]+={0,2})").ok())
        .as_ref()
}

fn bare_base64_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[A-Za-z0-9+/]{256,}={0,2}").ok())
        .as_ref()
}

fn parts(body: &Value) -> impl Iterator<Item = &Value> {
    body.get("candidates")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|candidate| candidate.pointer("/content/parts").and_then(Value::as_array))
        .flatten()
}

fn inline_image(body: &Value) -> Result<Option<Vec<u8>>, GenerationError> {
    for part in parts(body) {
        let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
            continue;
        };
        let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let bytes = BASE64.decode(data.as_bytes()).map_err(|e| {
            GenerationError::InvalidResponse(format!("inline image is not valid base64: {e}"))
        })?;
        return Ok(Some(bytes));
    }
    Ok(None)
}

fn response_text(body: &Value) -> String {
    parts(body)
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

fn data_url_image(text: &str) -> Option<Vec<u8>> {
    data_url_pattern()?
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| BASE64.decode(m.as_str()).ok())
}

fn bare_base64_image(text: &str) -> Option<Vec<u8>> {
    bare_base64_pattern()?
        .find_iter(text)
        .filter(|m| m.as_str().len() >= MIN_BARE_BASE64_LEN)
        .find_map(|m| BASE64.decode(m.as_str()).ok())
}

/// Find the generated image in a response body.
///
/// `Ok(None)` means the model answered without an image.
pub fn extract_image(body: &Value) -> Result<Option<Vec<u8>>, GenerationError> {
    if let Some(bytes) = inline_image(body)? {
        return Ok(Some(bytes).filter(|b| !b.is_empty()));
    }

    let text = response_text(body);
    if text.is_empty() {
        return Ok(None);
    }

    Ok(data_url_image(&text)
        .or_else(|| bare_base64_image(&text))
        .filter(|b| !b.is_empty()))
}

/// Message of an `{"error": {...}}` body whose status is `INTERNAL`.
pub fn internal_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    if error.get("status").and_then(Value::as_str) != Some("INTERNAL") {
        return None;
    }
    Some(
        error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("internal error")
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn long_payload() -> (Vec<u8>, String) {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(600).collect();
        let encoded = BASE64.encode(&bytes);
        (bytes, encoded)
    }

    #[test]
    fn test_inline_data_camel_case() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": BASE64.encode(b"png-bytes")}}
                ]}
            }]
        });
        assert_eq!(extract_image(&body).unwrap(), Some(b"png-bytes".to_vec()));
    }

    #[test]
    fn test_inline_data_snake_case_in_later_candidate() {
        let body = json!({
            "candidates": [
                {"content": {"parts": [{"text": "no image here"}]}},
                {"content": {"parts": [
                    {"inline_data": {"mime_type": "image/png", "data": BASE64.encode(b"second")}}
                ]}}
            ]
        });
        assert_eq!(extract_image(&body).unwrap(), Some(b"second".to_vec()));
    }

    #[test]
    fn test_inline_data_invalid_base64() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"data": "!!!not base64!!!"}}]}}]
        });
        assert!(matches!(
            extract_image(&body),
            Err(GenerationError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_data_url_in_text() {
        let text = format!(
            "Styled: data:image/png;base64,{} enjoy",
            BASE64.encode(b"from-data-url")
        );
        let body = json!({"candidates": [{"content": {"parts": [{"text": text}]}}]});
        assert_eq!(extract_image(&body).unwrap(), Some(b"from-data-url".to_vec()));
    }

    #[test]
    fn test_bare_base64_run() {
        let (bytes, encoded) = long_payload();
        let text = format!("Result:\n{encoded}\n");
        let body = json!({"candidates": [{"content": {"parts": [{"text": text}]}}]});
        assert_eq!(extract_image(&body).unwrap(), Some(bytes));
    }

    #[test]
    fn test_short_base64_run_ignored() {
        let short = BASE64.encode(b"short");
        let body = json!({"candidates": [{"content": {"parts": [{"text": short}]}}]});
        assert_eq!(extract_image(&body).unwrap(), None);
    }

    #[test]
    fn test_no_image() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "I can't do that."}]}}]});
        assert_eq!(extract_image(&body).unwrap(), None);
        assert_eq!(extract_image(&json!({})).unwrap(), None);
        assert_eq!(extract_image(&json!({"candidates": []})).unwrap(), None);
    }

    #[test]
    fn test_internal_error_message() {
        let body = json!({"error": {"code": 500, "status": "INTERNAL", "message": "try again"}});
        assert_eq!(internal_error_message(&body).as_deref(), Some("try again"));

        let body = json!({"error": {"code": 400, "status": "INVALID_ARGUMENT"}});
        assert!(internal_error_message(&body).is_none());
        assert!(internal_error_message(&json!({"candidates": []})).is_none());
    }
}
