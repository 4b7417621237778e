use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, CACHE_CONTROL, CONTENT_TYPE, ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Current time as an RFC 3339 UTC timestamp with millisecond precision.
pub fn current_time() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, data: &T) -> Response {
    match serde_json::to_vec_pretty(data) {
        Ok(bytes) => {
            let mut resp = Response::new(Body::from(bytes));
            *resp.status_mut() = status;
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            resp
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to serialise response body");
            let mut resp = Response::new(Body::from(r#"{"error":"Internal error"}"#));
            *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            resp
        }
    }
}

pub fn success_response<T: Serialize + ?Sized>(data: &T) -> Response {
    json_response(StatusCode::OK, data)
}

/// The value reflected in `Access-Control-Allow-Origin`: the caller's
/// `Origin`, or `*` when none was sent.
pub fn request_origin(headers: &HeaderMap) -> HeaderValue {
    headers
        .get(ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"))
}

pub fn cors_headers(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}

/// Stamp the response envelope shared by every non-preflight response.
pub fn with_envelope(mut resp: Response, origin: HeaderValue) -> Response {
    let headers = resp.headers_mut();
    cors_headers(headers, origin);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    resp
}

pub fn preflight_response(origin: HeaderValue) -> Response {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = StatusCode::NO_CONTENT;
    let headers = resp.headers_mut();
    cors_headers(headers, origin);
    headers.insert(
        ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE),
    );
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_utc_with_millis() {
        let ts = current_time();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert_eq!(ts.split('.').nth(1).map(str::len), Some(4));
    }

    #[test]
    fn origin_defaults_to_wildcard() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_origin(&headers), "*");
        headers.insert(ORIGIN, HeaderValue::from_static("http://localhost:4000"));
        assert_eq!(request_origin(&headers), "http://localhost:4000");
    }

    #[test]
    fn envelope_sets_cors_and_no_cache() {
        let resp = with_envelope(
            success_response(&serde_json::json!({"ok": true})),
            HeaderValue::from_static("*"),
        );
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(resp.headers()[CACHE_CONTROL], "no-cache");
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn preflight_advertises_max_age() {
        let resp = preflight_response(HeaderValue::from_static("https://example.net"));
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()[ACCESS_CONTROL_MAX_AGE], "86400");
        assert_eq!(
            resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://example.net"
        );
    }
}
