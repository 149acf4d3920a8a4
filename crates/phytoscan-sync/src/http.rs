//! HTTP classifier client for the `/predict/` endpoint.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::classifier::{ClassificationRequest, Classifier, SubmissionRequest};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Retry prompt suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(e) if e.is_connect() => {
                "Unable to connect to server. Please check your connection.".into()
            }
            Self::Http(e) if e.is_timeout() => "Request timed out. Please try again.".into(),
            Self::Server { status: 400, .. } => {
                "Invalid image format. Please try another image.".into()
            }
            Self::Server { status: 413, .. } => {
                "Image too large. Please use a smaller image.".into()
            }
            Self::Server { status: 415, .. } => {
                "Image format not supported. Please try a different image.".into()
            }
            Self::Server {
                status: 500..=599,
                message,
            } if !message.is_empty() => message.clone(),
            Self::Server {
                status: 500..=599, ..
            } => "Server error occurred. Please try again.".into(),
            _ => "An error occurred. Please try again.".into(),
        }
    }
}

/// Pull a human-readable message out of an error body: `message`, `error`,
/// the first of `errors`, or the raw text.
pub fn extract_server_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    for key in ["message", "error"] {
        if let Some(msg) = json.get(key).and_then(Value::as_str) {
            return msg.to_string();
        }
    }
    if let Some(first) = json
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(Value::as_str)
    {
        return first.to_string();
    }
    match json {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Multipart client for the classification service.
pub struct PredictionClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl PredictionClient {
    /// `base_url` is the API root, e.g. `http://127.0.0.1:8000/api`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `Authorization: Token <token>` on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn predict_url(&self) -> String {
        format!("{}/predict/", self.base_url)
    }

    async fn post_form(
        &self,
        fields: Vec<(&'static str, String)>,
        image: &[u8],
        file_name: &str,
    ) -> Result<Value, ClientError> {
        let mut form = Form::new().part(
            "image",
            Part::bytes(image.to_vec())
                .file_name(file_name.to_string())
                .mime_str("image/jpeg")?,
        );
        for (name, value) in fields {
            form = form.text(name, value);
        }

        let url = self.predict_url();
        let mut req = self.client.post(&url).multipart(form);
        if let Some(token) = &self.token {
            req = req.header(reqwest::header::AUTHORIZATION, format!("Token {token}"));
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = extract_server_message(&body);
            warn!(url = %url, status = status.as_u16(), message = %message, "prediction request failed");
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Classifier for PredictionClient {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Value, ClientError> {
        info!(
            detection_type = %request.detection_type,
            preview = request.preview,
            bytes = request.image.len(),
            "requesting classification"
        );
        let value = self
            .post_form(request.form_fields(), &request.image, &request.file_name)
            .await?;
        info!("classification response received");
        Ok(value)
    }

    async fn submit(&self, request: &SubmissionRequest) -> Result<Value, ClientError> {
        info!(
            detection_type = %request.detection_type,
            correct = request.is_detection_correct,
            with_location = request.location.is_some(),
            "submitting verified detection"
        );
        let value = self
            .post_form(request.form_fields(), &request.image, &request.file_name)
            .await?;
        info!("submission accepted");
        Ok(value)
    }
}
