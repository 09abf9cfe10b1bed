//! Topology controller (GNS3 `v2` REST API) read client.
use std::time::Duration;

use async_trait::async_trait;
use ibn_core::{ControllerConfig, IbnError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerProject {
    pub project_id: String,
    pub name: String,
    #[serde(default, alias = "project_path")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerNode {
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub console_host: Option<String>,
    /// The controller reports the console TCP port as `console`.
    #[serde(default, alias = "console")]
    pub console_port: Option<u16>,
    #[serde(default = "unknown_status")]
    pub status: String,
    #[serde(default)]
    pub properties: Value,
}

fn unknown_status() -> String {
    "unknown".to_string()
}

/// Read-only view of the controller used to build inventory snapshots.
#[async_trait]
pub trait TopologyController: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<ControllerProject>>;

    async fn project_nodes(&self, project_id: &str) -> Result<Vec<ControllerNode>>;

    /// Raw node detail; a missing node surfaces as a 404 `ControllerApi` error.
    async fn node_detail(&self, project_id: &str, node_id: &str) -> Result<Value>;

    async fn project_links(&self, project_id: &str) -> Result<Vec<Value>>;

    async fn find_project(&self, name: &str) -> Result<Option<ControllerProject>> {
        Ok(self
            .list_projects()
            .await?
            .into_iter()
            .find(|p| p.name == name))
    }
}

/// HTTP client for the controller API.
#[derive(Clone)]
pub struct ControllerClient {
    http: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl ControllerClient {
    pub fn new(config: &ControllerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| IbnError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            credentials: config
                .credentials()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url).header("Accept", "application/json");
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| IbnError::Http(format!("GET {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IbnError::ControllerApi {
                method: "GET".to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        debug!(path, status = status.as_u16(), "controller request");

        response
            .json()
            .await
            .map_err(|e| IbnError::Serialization(format!("failed to parse response from {}: {}", path, e)))
    }
}

#[async_trait]
impl TopologyController for ControllerClient {
    async fn list_projects(&self) -> Result<Vec<ControllerProject>> {
        self.get("/projects").await
    }

    async fn project_nodes(&self, project_id: &str) -> Result<Vec<ControllerNode>> {
        self.get(&format!("/projects/{}/nodes", project_id)).await
    }

    async fn node_detail(&self, project_id: &str, node_id: &str) -> Result<Value> {
        self.get(&format!("/projects/{}/nodes/{}", project_id, node_id))
            .await
    }

    async fn project_links(&self, project_id: &str) -> Result<Vec<Value>> {
        self.get(&format!("/projects/{}/links", project_id)).await
    }
}
