//! API client for communicating with a running daycast server

use anyhow::{Context, Result};
use forecast_lib::RawInput;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the forecast server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a POST request with JSON body.
    ///
    /// A non-success response is reported with the server's `error` field
    /// when the body carries one.
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Request a forecast for `input`
    pub async fn predict(&self, input: &RawInput) -> Result<PredictResponse> {
        self.post("api/predict", input).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<f64>,
    pub days_used: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_predict_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/predict")
            .match_body(mockito::Matcher::Json(json!({"day1": 10.0, "day2": 11.0})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"predictions": (10..40).map(f64::from).collect::<Vec<f64>>(), "days_used": 2})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client
            .predict(&RawInput::from_days(&[10.0, 11.0]))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.days_used, 2);
        assert_eq!(response.predictions.len(), 30);
    }

    #[tokio::test]
    async fn test_predict_surfaces_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/predict")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "no model for 7 days"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .predict(&RawInput::from_days(&[1.0; 7]))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("no model for 7 days"));
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_kept() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/predict")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .predict(&RawInput::from_days(&[1.0]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
