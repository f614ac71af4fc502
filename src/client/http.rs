//! NAS HTTP Client
//!
//! Thin wrapper over `reqwest` that carries the dashboard session cookie,
//! attaches the anti-forgery header to state-changing calls and maps
//! response statuses onto the crate's error taxonomy.

use crate::domain::ports::{DeviceClass, OperationExecutor, OperationResult, ProvisionPayload};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Anti-forgery header name
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Cookie holding the anti-forgery token
pub const CSRF_COOKIE: &str = "csrf_token";

/// Failure detail used when the server gives none
pub const DEFAULT_FAILURE_DETAIL: &str = "Request failed";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the NAS API client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL of the dashboard backend
    pub base_url: String,
    /// Raw `Cookie` header value of an authenticated session
    pub session_cookie: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            session_cookie: None,
            request_timeout: Duration::from_secs(30 * 60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// =============================================================================
// Wire Envelope
// =============================================================================

/// Standard `{ ok, message, data }` response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Look up one cookie in a `Cookie` header string
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Extract the operator-facing detail from a failure body
pub fn failure_detail(body: &[u8]) -> String {
    let detail = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("detail").cloned());

    match detail {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s,
        Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) | None => {
            DEFAULT_FAILURE_DETAIL.to_string()
        }
        Some(other) => other.to_string(),
    }
}

/// Path of the provisioning endpoint for a device class
pub fn provision_path(device_class: DeviceClass) -> String {
    format!("/api/storage/{}/provision-smb", device_class)
}

// =============================================================================
// API Client
// =============================================================================

/// Cookie-authenticated client for the dashboard REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl ApiClient {
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Configuration("API base URL is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        if let Some(cookie) = config.session_cookie.as_deref().filter(|c| !c.is_empty()) {
            let value = HeaderValue::from_str(cookie).map_err(|e| {
                Error::Configuration(format!("Invalid session cookie: {}", e))
            })?;
            headers.insert(COOKIE, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            session_cookie: config.session_cookie.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Anti-forgery token from the session cookie, empty when absent
    pub fn csrf_token(&self) -> String {
        self.session_cookie
            .as_deref()
            .and_then(|c| cookie_value(c, CSRF_COOKIE))
            .unwrap_or_default()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    /// POST a JSON body with the anti-forgery header attached
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", path);
        let response = self
            .http
            .post(self.url(path))
            .header(CSRF_HEADER, self.csrf_token())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::Remote(e.to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::AuthExpired);
    }

    let body = response.bytes().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(Error::Remote(failure_detail(&body)));
    }

    Ok(serde_json::from_slice(&body)?)
}

// =============================================================================
// Operation Executor
// =============================================================================

/// Executor that performs the whole provisioning run in one POST
#[derive(Debug, Clone)]
pub struct HttpOperationClient {
    api: ApiClient,
}

impl HttpOperationClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl OperationExecutor for HttpOperationClient {
    async fn submit(
        &self,
        device_class: DeviceClass,
        payload: &ProvisionPayload,
    ) -> Result<OperationResult> {
        info!(
            "Submitting {} provisioning for {} as share {:?}",
            device_class.label(),
            payload.device,
            payload.share_name
        );

        let envelope: ApiEnvelope<serde_json::Value> =
            self.api.post_json(&provision_path(device_class), payload).await?;

        Ok(OperationResult {
            message: envelope.message.unwrap_or_default(),
            data: envelope.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{FsType, ProvisionRequest};
    use assert_matches::assert_matches;
    use axum::extract::Json;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String) -> HttpOperationClient {
        let config = HttpClientConfig {
            base_url,
            session_cookie: Some("session=abc; csrf_token=tok123".to_string()),
            ..Default::default()
        };
        HttpOperationClient::new(ApiClient::new(&config).unwrap())
    }

    fn payload() -> ProvisionPayload {
        let request = ProvisionRequest::from_form(
            "/dev/sdb",
            "media",
            None,
            Some(FsType::Exfat),
            true,
            false,
            None,
        );
        ProvisionPayload::from(&request)
    }

    #[test]
    fn test_cookie_value() {
        let cookies = "session=abc; csrf_token=tok123; theme=dark";
        assert_eq!(cookie_value(cookies, "csrf_token").as_deref(), Some("tok123"));
        assert_eq!(cookie_value(cookies, "theme").as_deref(), Some("dark"));
        assert_eq!(cookie_value(cookies, "missing"), None);
        assert_eq!(cookie_value("csrf_token=", "csrf_token"), None);
    }

    #[test]
    fn test_failure_detail() {
        assert_eq!(failure_detail(br#"{"detail":"Device busy"}"#), "Device busy");
        assert_eq!(failure_detail(br#"{"detail":""}"#), "Request failed");
        assert_eq!(failure_detail(b"<html>oops</html>"), "Request failed");
        assert_eq!(failure_detail(br#"{"message":"x"}"#), "Request failed");
        assert_eq!(failure_detail(br#"{"detail":[{"msg":"bad"}]}"#), r#"[{"msg":"bad"}]"#);
    }

    #[test]
    fn test_provision_path() {
        assert_eq!(provision_path(DeviceClass::Usb), "/api/storage/usb/provision-smb");
        assert_eq!(provision_path(DeviceClass::Nvme), "/api/storage/nvme/provision-smb");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let config = HttpClientConfig {
            base_url: "/".to_string(),
            ..Default::default()
        };
        assert_matches!(ApiClient::new(&config), Err(Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_submit_success_sends_headers_and_payload() {
        async fn handler(headers: AxumHeaders, Json(body): Json<serde_json::Value>) -> impl IntoResponse {
            let csrf = headers.get("x-csrf-token").and_then(|v| v.to_str().ok()).unwrap_or("");
            let cookie = headers.get("cookie").and_then(|v| v.to_str().ok()).unwrap_or("");
            if csrf != "tok123" || !cookie.contains("session=abc") {
                return (AxumStatus::FORBIDDEN, Json(json!({"detail": "CSRF validation failed"})));
            }
            assert_eq!(body["device"], "/dev/sdb");
            assert_eq!(body["format_before_mount"], true);
            assert_eq!(body["fs_type"], "exfat");
            assert_eq!(body["wipe_repartition"], false);
            (
                AxumStatus::OK,
                Json(json!({"ok": true, "message": "Share created", "data": {"share": "media"}})),
            )
        }

        let base = serve(Router::new().route("/api/storage/usb/provision-smb", post(handler))).await;
        let result = client(base).submit(DeviceClass::Usb, &payload()).await.unwrap();

        assert_eq!(result.message, "Share created");
        assert_eq!(result.data, Some(json!({"share": "media"})));
    }

    #[tokio::test]
    async fn test_submit_rejection_carries_detail() {
        let router = Router::new().route(
            "/api/storage/nvme/provision-smb",
            post(|| async {
                (
                    AxumStatus::BAD_REQUEST,
                    Json(json!({"detail": "Selected device is not NVMe storage"})),
                )
            }),
        );
        let base = serve(router).await;

        let err = client(base).submit(DeviceClass::Nvme, &payload()).await.unwrap_err();
        assert_matches!(err, Error::Remote(ref detail) if detail == "Selected device is not NVMe storage");
    }

    #[tokio::test]
    async fn test_submit_without_detail_is_request_failed() {
        let router = Router::new().route(
            "/api/storage/usb/provision-smb",
            post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(router).await;

        let err = client(base).submit(DeviceClass::Usb, &payload()).await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed");
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_expired() {
        let router = Router::new().route(
            "/api/storage/usb/provision-smb",
            post(|| async { (AxumStatus::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"}))) }),
        );
        let base = serve(router).await;

        let err = client(base).submit(DeviceClass::Usb, &payload()).await.unwrap_err();
        assert_matches!(err, Error::AuthExpired);
    }

    #[tokio::test]
    async fn test_transport_failure_is_remote_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{}", addr))
            .submit(DeviceClass::Usb, &payload())
            .await
            .unwrap_err();
        assert_matches!(err, Error::Remote(_));
    }
}
