use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;

/// Error body returned by the daemon.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    pub service: Option<String>,
}

/// Build an HTTP client with optional Bearer token default header.
pub fn build_client(token: &Option<String>) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(tok) = token {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", tok).parse()?);
        builder = builder.default_headers(headers);
    }
    Ok(builder.build()?)
}

/// `<base>/services/<name>/<action>` with the name encoded as one path segment.
pub fn service_url(base: &str, name: &str, action: &str) -> anyhow::Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base)?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API base url cannot carry a path: {base}"))?;
        segments
            .pop_if_empty()
            .push("services")
            .push(name)
            .push(action);
    }
    Ok(url)
}

/// Normalize non-2xx responses into errors while returning the response on success.
pub async fn handle_error(resp: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body: ApiErrorBody = resp.json().await.unwrap_or_default();
    tracing::debug!(%status, code = %body.code, "request failed");
    Err(anyhow::anyhow!(describe_failure(status, &body)))
}

fn describe_failure(status: StatusCode, body: &ApiErrorBody) -> String {
    let code = if body.code.is_empty() {
        status.as_str()
    } else {
        body.code.as_str()
    };
    let message = if body.message.is_empty() {
        status.canonical_reason().unwrap_or("unknown error")
    } else {
        body.message.as_str()
    };
    match &body.service {
        Some(service) => format!("[{code}] {service}: {message}"),
        None => format!("[{code}] {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_api_errors() {
        let body = ApiErrorBody {
            code: "invalid_state".into(),
            message: "service is already running".into(),
            service: Some("Redis".into()),
        };
        assert_eq!(
            describe_failure(StatusCode::CONFLICT, &body),
            "[invalid_state] Redis: service is already running"
        );
    }

    #[test]
    fn service_names_are_encoded_as_one_segment() {
        let url = service_url("http://127.0.0.1:7878", "odd#name?x%", "status").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:7878/services/odd%23name%3Fx%25/status"
        );

        let url = service_url("http://localhost:7878/api/", "Redis", "start").unwrap();
        assert_eq!(url.as_str(), "http://localhost:7878/api/services/Redis/start");
    }

    #[test]
    fn falls_back_to_http_status() {
        let body = ApiErrorBody::default();
        assert_eq!(
            describe_failure(StatusCode::UNAUTHORIZED, &body),
            "[401] Unauthorized"
        );
    }
}
