//! `fetch`-based transport
//!
//! Requests go to the page's own origin with credentials included, so the
//! session cookie travels with them.

use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder};
use web_sys::RequestCredentials;

use revdash::{DashboardError, DashboardResult, HttpResponse, Transport};

pub struct GlooTransport;

impl GlooTransport {
    async fn send(request: RequestBuilder) -> DashboardResult<HttpResponse> {
        let response = request
            .credentials(RequestCredentials::Include)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| DashboardError::Network(format!("Network error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::Network(format!("Read error: {}", e)))?;

        Ok(HttpResponse::new(status, body))
    }
}

#[async_trait(?Send)]
impl Transport for GlooTransport {
    async fn get(&self, path: &str) -> DashboardResult<HttpResponse> {
        Self::send(Request::get(path)).await
    }

    async fn post(&self, path: &str) -> DashboardResult<HttpResponse> {
        Self::send(Request::post(path)).await
    }
}
