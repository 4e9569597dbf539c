use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// HTTP access to a monitored instance's actuator endpoints.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    /// `GET http://{address}{path}`, decoded as JSON.
    async fn get_json(&self, address: &str, path: &str) -> Result<Value>;
}

pub struct ActuatorClient {
    client: Client,
}

impl ActuatorClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

pub fn target_url(address: &str, path: &str) -> String {
    format!("http://{}{}", address, path)
}

#[async_trait]
impl TelemetryClient for ActuatorClient {
    async fn get_json(&self, address: &str, path: &str) -> Result<Value> {
        let url = target_url(address, path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Http(format!("{}: {}", url, e)))?
            .error_for_status()
            .map_err(|e| AppError::Http(format!("{}: {}", url, e)))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse response from {}: {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url() {
        assert_eq!(
            target_url("10.0.0.1:8080", "/actuator/metrics/jvm.threads.live"),
            "http://10.0.0.1:8080/actuator/metrics/jvm.threads.live"
        );
    }

    #[tokio::test]
    async fn test_unreachable_instance_is_an_error() {
        let client = ActuatorClient::new(Duration::from_millis(200));
        let result = client
            .get_json("127.0.0.1:1", "/actuator/metrics/jvm.threads.live")
            .await;
        assert!(matches!(result, Err(AppError::Http(_))));
    }
}
