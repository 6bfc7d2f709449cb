use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use url::Url;

use crate::config::CaptionConfig;

#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),
    #[error("Caption service returned status {0}")]
    Status(u16),
}

/// Image-to-text model reachable over the network.
///
/// Implementations block the calling thread for the duration of the call.
pub trait CaptionService: Send + Sync {
    fn caption(&self, png: &[u8]) -> Result<String, CaptionError>;
}

/// Client for a hosted inference API that answers with `generated_text`.
pub struct HuggingFaceCaptioner {
    client: Client,
    url: Url,
    api_key: Option<String>,
}

impl HuggingFaceCaptioner {
    pub fn new(config: &CaptionConfig, api_key: Option<String>) -> Result<Self, CaptionError> {
        let url = Url::parse(&format!(
            "{}/{}",
            config.endpoint.trim_end_matches('/'),
            config.model.trim_start_matches('/')
        ))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl CaptionService for HuggingFaceCaptioner {
    fn caption(&self, png: &[u8]) -> Result<String, CaptionError> {
        let mut request = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "image/png")
            .body(png.to_vec());
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", key));
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("Caption service at {} answered {}", self.url, status);
            return Err(CaptionError::Status(status.as_u16()));
        }
        let body: Value = response.json()?;
        Ok(extract_caption(&body))
    }
}

/// Pulls the caption out of the `[{"generated_text": ..}]` or
/// `{"generated_text": ..}` shapes; anything else is used verbatim.
pub fn extract_caption(body: &Value) -> String {
    match body {
        Value::Array(items) if !items.is_empty() => generated_text(&items[0]),
        Value::Object(_) => generated_text(body),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn generated_text(value: &Value) -> String {
    value
        .get("generated_text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn caption_from_list_body() {
        let body = json!([{ "generated_text": "an ultrasound of an ovary" }]);
        assert_eq!(extract_caption(&body), "an ultrasound of an ovary");
    }

    #[test]
    fn caption_from_object_body() {
        assert_eq!(extract_caption(&json!({ "generated_text": "a scan" })), "a scan");
        assert_eq!(extract_caption(&json!({ "error": "loading" })), "");
    }

    #[test]
    fn unexpected_body_is_stringified() {
        assert_eq!(extract_caption(&json!([])), "[]");
        assert_eq!(extract_caption(&json!(42)), "42");
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let config = CaptionConfig {
            endpoint: "https://api-inference.huggingface.co/models/".into(),
            model: "Salesforce/blip-image-captioning-large".into(),
            timeout_secs: 5,
            api_key_env: "HUGGINGFACE_API_KEY".into(),
        };
        let captioner = HuggingFaceCaptioner::new(&config, Some("  ".into())).unwrap();
        assert_eq!(
            captioner.url().as_str(),
            "https://api-inference.huggingface.co/models/Salesforce/blip-image-captioning-large"
        );
        assert!(captioner.api_key.is_none());
    }
}
