//! Base HTTP client with shared logic

use crate::infrastructure::model::types::CompletionError;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct HttpClientBase {
    pub id: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub http: Client,
}

impl HttpClientBase {
    pub fn new(id: String, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            id,
            endpoint,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            http: Client::new(),
        }
    }

    /// Build URL from endpoint and path
    pub fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Post JSON, with bearer auth when a key is configured
    pub async fn post_json<Req, Res>(&self, url: &str, body: &Req) -> Result<Res, CompletionError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let mut request = self.http.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        request
            .send()
            .await
            .map_err(|e| CompletionError::network(&self.id, e))?
            .error_for_status()
            .map_err(|e| CompletionError::network(&self.id, e))?
            .json()
            .await
            .map_err(|e| CompletionError::network(&self.id, e))
    }
}
