//! HTTP client for the read-only endpoints the dashboard polls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::DashboardError;
use crate::models::Vehicle;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `GET /vehicle/inside`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsideSnapshot {
    pub total: usize,
    pub vehicles: Vec<Vehicle>,
}

/// `GET /vehicle/history/today`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodaySnapshot {
    pub date: String,
    pub total: usize,
    pub vehicles: Vec<Vehicle>,
}

#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
    origin: String,
}

impl DashboardClient {
    /// `origin` is the API base such as `http://localhost:8080`; a trailing slash is ignored.
    pub fn new(origin: impl Into<String>) -> Result<Self, DashboardError> {
        let origin = origin.into().trim_end_matches('/').to_string();
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(DashboardError::InvalidOrigin(origin));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, origin })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, DashboardError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.origin, path);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }

    pub async fn fetch_inside(&self) -> Result<InsideSnapshot, DashboardError> {
        self.get_json("/vehicle/inside").await
    }

    pub async fn fetch_today(&self) -> Result<TodaySnapshot, DashboardError> {
        self.get_json("/vehicle/history/today").await
    }
}

/// Make an image reference loadable from the dashboard.
///
/// Absolute `http(s)` URLs are kept; anything else is treated as a path on the API origin.
pub fn resolve_image_url(origin: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let origin = origin.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", origin, path)
    } else {
        format!("{}/{}", origin, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_image_url() {
        let origin = "http://localhost:8080/";
        assert_eq!(
            resolve_image_url(origin, "/images/in.jpg"),
            "http://localhost:8080/images/in.jpg"
        );
        assert_eq!(
            resolve_image_url(origin, "images/in.jpg"),
            "http://localhost:8080/images/in.jpg"
        );
        assert_eq!(
            resolve_image_url(origin, "https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn test_client_rejects_bad_origin() {
        assert!(matches!(
            DashboardClient::new("localhost:8080"),
            Err(DashboardError::InvalidOrigin(_))
        ));
        let client = DashboardClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.origin(), "http://localhost:8080");
    }
}
