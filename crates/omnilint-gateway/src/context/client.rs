use axum::http::HeaderMap;
use uuid::Uuid;

/// Key used when no proxy header identifies the caller.
pub const LOCAL_CLIENT: &str = "local";

/// Rate-limit key: first `x-forwarded-for` hop, else `x-real-ip`, else [`LOCAL_CLIENT`].
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(LOCAL_CLIENT)
        .to_string()
}

/// Identity of one inbound request, for correlation in logs and responses.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub request_id: String,
    pub client: String,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            client: client_key(headers),
        }
    }
}
