use crate::errors::AppError;
use crate::remote::types::{
    DetectionFilter, DetectionPage, FrameQuery, LabelCount, LearnResponse, LearnedSummary,
    RecognizeResponse, ServiceStats,
};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// The surface of the remote vision/inventory service the capture pipeline
/// and the dashboard poller rely on. Kept as a trait so the coordinator can
/// be exercised against a scripted service in tests.
#[async_trait]
pub trait VisionApi: Send + Sync {
    async fn learn_frame(&self, image: Vec<u8>, query: &FrameQuery) -> Result<LearnResponse, AppError>;
    async fn vision_frame(&self, image: Vec<u8>, query: &FrameQuery) -> Result<RecognizeResponse, AppError>;
    async fn stats(&self) -> Result<ServiceStats, AppError>;
    async fn counts(&self, limit: u32) -> Result<Vec<LabelCount>, AppError>;
    async fn detections(&self, filter: &DetectionFilter) -> Result<DetectionPage, AppError>;
    async fn learned_summary(&self, limit: u32) -> Result<LearnedSummary, AppError>;
}

#[derive(Clone)]
pub struct RemoteVisionClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteVisionClient {
    pub fn new(base_url: &str) -> Self {
        RemoteVisionClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Image references in detection rows are paths relative to the service
    /// base address.
    pub fn resolve_image_url(&self, image_path: &str) -> String {
        format!("{}/{}", self.base_url, image_path.trim_start_matches('/'))
    }

    async fn post_frame<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        image: Vec<u8>,
        query: &FrameQuery,
    ) -> Result<T, AppError> {
        let send_start = Instant::now();
        let part = multipart::Part::bytes(image)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| AppError::Transport(format!("Failed to build multipart body: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url(endpoint))
            .query(&query.to_pairs())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("POST {} -> {} in {:?} ({} bytes)", endpoint, status, send_start.elapsed(), text.len());
        decode_frame_body(endpoint, status, text)
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str, pairs: &[(&str, String)]) -> Result<T, AppError> {
        let response = self.http.get(self.url(path_and_query)).query(pairs).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transport(format!("GET {} -> {}", path_and_query, status.as_u16())));
        }
        Ok(response.json::<T>().await?)
    }

    /// `POST /inventory/clear` with the static shared-secret header. The
    /// caller is responsible for the operator confirmation step.
    pub async fn clear_inventory(&self, token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.url("/inventory/clear"))
            .header("X-Token", token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = if body.is_empty() {
                format!("POST /inventory/clear -> {}", status.as_u16())
            } else {
                body
            };
            return Err(AppError::Transport(detail));
        }
        info!("🧹 Inventory ledger cleared on the remote service.");
        Ok(())
    }

    /// Streams `GET /export.csv` into `dest_path`. The CSV is never parsed,
    /// only written out.
    pub async fn export_csv(&self, filter: &DetectionFilter, dest_path: &Path) -> Result<PathBuf, AppError> {
        let response = self
            .http
            .get(self.url("/export.csv"))
            .query(&filter.to_export_pairs())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transport(format!("GET /export.csv -> {}", status.as_u16())));
        }
        let bytes = response.bytes().await?;
        let mut file = File::create(dest_path).await?;
        file.write_all(&bytes).await?;
        info!("💾 Exported {} bytes of CSV to {}", bytes.len(), dest_path.display());
        Ok(dest_path.to_path_buf())
    }
}

/// Parse a mutating-endpoint body as JSON, falling back to a raw-text wrapper
/// when the body is not JSON. Non-success statuses surface the server-supplied
/// `detail` message when present, otherwise a generic status-coded message.
fn decode_frame_body<T: DeserializeOwned>(
    endpoint: &str,
    status: StatusCode,
    text: String,
) -> Result<T, AppError> {
    let value: serde_json::Value =
        serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({ "raw": text }));
    if !status.is_success() {
        let detail = value
            .get("detail")
            .and_then(|d| d.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("POST {} -> {}", endpoint, status.as_u16()));
        return Err(AppError::Transport(detail));
    }
    serde_json::from_value(value)
        .map_err(|e| AppError::Transport(format!("Malformed response from {}: {}", endpoint, e)))
}

#[async_trait]
impl VisionApi for RemoteVisionClient {
    async fn learn_frame(&self, image: Vec<u8>, query: &FrameQuery) -> Result<LearnResponse, AppError> {
        self.post_frame("/learn/frame", image, query).await
    }

    async fn vision_frame(&self, image: Vec<u8>, query: &FrameQuery) -> Result<RecognizeResponse, AppError> {
        self.post_frame("/vision/frame", image, query).await
    }

    async fn stats(&self) -> Result<ServiceStats, AppError> {
        self.get_json("/stats", &[]).await
    }

    async fn counts(&self, limit: u32) -> Result<Vec<LabelCount>, AppError> {
        self.get_json("/counts", &[("limit", limit.to_string())]).await
    }

    async fn detections(&self, filter: &DetectionFilter) -> Result<DetectionPage, AppError> {
        self.get_json("/detections", &filter.to_pairs()).await
    }

    async fn learned_summary(&self, limit: u32) -> Result<LearnedSummary, AppError> {
        self.get_json("/learned/summary", &[("limit", limit.to_string())]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn stats_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_events": 42, "total_labels": 7
            })))
            .mount(&server)
            .await;

        let client = RemoteVisionClient::new(&server.uri());
        let stats = client.stats().await.unwrap();
        assert_eq!(stats.total_events, 42);
        assert_eq!(stats.total_labels, 7);
    }

    #[tokio::test]
    async fn read_failure_is_a_uniform_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = RemoteVisionClient::new(&server.uri());
        let err = client.stats().await.unwrap_err();
        match err {
            AppError::Transport(msg) => assert!(msg.contains("503"), "{}", msg),
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn learn_frame_sends_query_and_parses_saved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/learn/frame"))
            .and(query_param("label", "mouse"))
            .and(query_param("cooldown_ms", "1200"))
            .and(query_param("ignore_person", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "saved": true, "debug": {"box": [10.0, 20.0, 110.0, 120.0]}
            })))
            .mount(&server)
            .await;

        let client = RemoteVisionClient::new(&server.uri());
        let query = FrameQuery {
            label: Some("mouse".to_string()),
            cooldown_ms: Some(1200),
            ignore_person: true,
            ..Default::default()
        };
        let resp = client.learn_frame(vec![0xff, 0xd8], &query).await.unwrap();
        assert!(resp.saved);
        assert_eq!(resp.detection_box(), Some([10.0, 20.0, 110.0, 120.0]));
    }

    #[tokio::test]
    async fn vision_frame_error_carries_server_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vision/frame"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({ "detail": "no object in frame" })),
            )
            .mount(&server)
            .await;

        let client = RemoteVisionClient::new(&server.uri());
        let query = FrameQuery { save: Some(true), force_save: Some(false), ignore_person: true, ..Default::default() };
        let err = client.vision_frame(vec![1, 2, 3], &query).await.unwrap_err();
        match err {
            AppError::Transport(msg) => assert_eq!(msg, "no object in frame"),
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn vision_frame_non_json_body_falls_back_to_raw() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vision/frame"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
            .mount(&server)
            .await;

        let client = RemoteVisionClient::new(&server.uri());
        let query = FrameQuery { ignore_person: true, ..Default::default() };
        let resp = client.vision_frame(vec![1], &query).await.unwrap();
        assert!(!resp.recognized);
        assert_eq!(resp.raw.as_deref(), Some("plain text"));
    }

    #[tokio::test]
    async fn detections_pass_filter_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/detections"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "25"))
            .and(query_param("label", "mouse"))
            .and(query_param("last_minutes", "60"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": 1, "label": "mouse", "confidence": 0.97,
                           "ts": "2026-08-30T10:00:00", "camera_id": "cam0",
                           "model": "clip", "image_path": "shots/1.jpg"}],
                "total": 30
            })))
            .mount(&server)
            .await;

        let client = RemoteVisionClient::new(&server.uri());
        let filter = DetectionFilter {
            page: 2,
            page_size: 25,
            label: Some("mouse".to_string()),
            last_minutes: 60,
        };
        let page = client.detections(&filter).await.unwrap();
        assert_eq!(page.total, 30);
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            client.resolve_image_url(page.items[0].image_path.as_deref().unwrap()),
            format!("{}/shots/1.jpg", server.uri())
        );
    }

    #[tokio::test]
    async fn clear_inventory_sends_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/inventory/clear"))
            .and(header("X-Token", "sekret"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/inventory/clear"))
            .respond_with(ResponseTemplate::new(403).set_body_string("bad token"))
            .mount(&server)
            .await;

        let client = RemoteVisionClient::new(&server.uri());
        client.clear_inventory("sekret").await.unwrap();

        let err = client.clear_inventory("wrong").await.unwrap_err();
        match err {
            AppError::Transport(msg) => assert_eq!(msg, "bad token"),
            other => panic!("expected Transport, got {:?}", other),
        }
    }
}
