//! CitySDK Mobility adapter.
//!
//! Nodes are pushed into one CitySDK layer. Creates and updates share the
//! `PUT {url}nodes/{layer}` endpoint and differ only in the envelope:
//! a create carries the local slug as `id`, an update carries the recorded
//! CitySDK id as `cdk_id`.

use super::session::{SessionCache, AUTH_HEADER};
use super::{ConvertMode, SyncNode, SyncOutcome, SyncSession, Synchronizer};
use crate::config::{AdapterConfig, AppConfig, NetworkConfig};
use crate::error::{MeshError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};
use url::Url;

pub struct CitySdkMobility {
    config: AdapterConfig,
    client: Client,
    base_url: Url,
    sessions: SessionCache,
}

impl CitySdkMobility {
    pub const PROVIDER: &'static str = "citysdk_mobility";

    pub const REQUIRED_CONFIG_KEYS: [&'static str; 4] = [
        "citysdk_url",
        "citysdk_layer",
        "citysdk_username",
        "citysdk_password",
    ];

    /// Build the adapter. Fails on missing settings before any request.
    pub fn new(config: AdapterConfig) -> Result<Self> {
        check_required(&config)?;

        let mut raw_url = config.require("citysdk_url")?.trim().to_string();
        if !raw_url.ends_with('/') {
            raw_url.push('/');
        }
        let base_url = Url::parse(&raw_url).map_err(|e| {
            MeshError::config(format!("Invalid citysdk_url '{}': {}", raw_url, e))
        })?;

        let client = Client::builder()
            .timeout(NetworkConfig::REQUEST_TIMEOUT)
            .connect_timeout(NetworkConfig::CONNECT_TIMEOUT)
            .user_agent(AppConfig::USER_AGENT)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| MeshError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: None,
            })?;

        let acquire_url = join(
            &base_url,
            &format!(
                "get_session?e={}&p={}",
                urlencoding::encode(config.require("citysdk_username")?),
                urlencoding::encode(config.require("citysdk_password")?)
            ),
        )?;
        let release_url = join(&base_url, "release_session")?;
        let sessions = SessionCache::new(client.clone(), Self::PROVIDER, acquire_url, release_url);

        Ok(Self {
            config,
            client,
            base_url,
            sessions,
        })
    }

    /// Session bookkeeping, mostly useful to check that every session was released.
    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    fn layer(&self) -> Result<&str> {
        self.config.require("citysdk_layer")
    }

    async fn upsert(&self, node: &SyncNode, mode: ConvertMode) -> Result<SyncOutcome> {
        let envelope = self.convert_format(node, mode)?;
        let url = join(&self.base_url, &format!("nodes/{}", self.layer()?))?;

        let session = self.get_session().await?;
        let response = self
            .client
            .put(url)
            .header(AUTH_HEADER, session.token())
            .json(&envelope)
            .send()
            .await;
        self.release_quietly(session).await;

        let outcome = evaluate(response, true).await;
        let verb = match mode {
            ConvertMode::Create => "creating",
            ConvertMode::Update => "updating",
        };
        match &outcome {
            SyncOutcome::Applied => info!(node = %node.slug, "Done {} record in CitySDK", verb),
            SyncOutcome::Rejected { status, message } => error!(
                node = %node.slug,
                status = ?status,
                "Error while {} record in CitySDK: {}",
                verb,
                message
            ),
        }
        Ok(outcome)
    }

    async fn release_quietly(&self, session: SyncSession) {
        if let Err(e) = self.release_session(session).await {
            warn!("Could not release CitySDK session: {}", e);
        }
    }
}

#[async_trait]
impl Synchronizer for CitySdkMobility {
    fn provider(&self) -> &str {
        Self::PROVIDER
    }

    fn validate_config(&self) -> Result<()> {
        check_required(&self.config)
    }

    async fn get_session(&self) -> Result<SyncSession> {
        self.sessions.acquire().await
    }

    async fn release_session(&self, session: SyncSession) -> Result<()> {
        self.sessions.release(session).await
    }

    fn convert_format(&self, node: &SyncNode, mode: ConvertMode) -> Result<Value> {
        let mut data: Map<String, Value> = node
            .data
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        if !node.status.is_empty() {
            data.insert("status".into(), json!(node.status));
        }
        if let Some(description) = node.description.as_deref().filter(|d| !d.is_empty()) {
            data.insert("description".into(), json!(description));
        }
        if let Some(address) = node.address.as_deref().filter(|a| !a.is_empty()) {
            data.insert("address".into(), json!(address));
        }
        if let Some(elevation) = node.elevation {
            data.insert("elevation".into(), json!(elevation));
        }
        if let Some(owner) = node.owner.as_deref().filter(|o| !o.is_empty()) {
            data.insert("owner".into(), json!(owner));
        }

        let mut record = json!({
            "name": node.name,
            "geom": node.geometry.to_geojson(),
            "data": data,
        });
        match mode {
            ConvertMode::Create => record["id"] = json!(node.slug),
            ConvertMode::Update => {
                let external_id = node.external_id.as_deref().ok_or_else(|| {
                    MeshError::validation(
                        "external_id",
                        format!("node '{}' has no CitySDK id to update", node.slug),
                    )
                })?;
                record["cdk_id"] = json!(external_id);
            }
        }

        Ok(json!({
            "create": {
                "params": {
                    "create_type": mode.as_str(),
                    "srid": NetworkConfig::WGS84_SRID,
                }
            },
            "nodes": [record],
        }))
    }

    async fn add(&self, node: &SyncNode) -> Result<SyncOutcome> {
        self.upsert(node, ConvertMode::Create).await
    }

    async fn change(&self, node: &SyncNode) -> Result<SyncOutcome> {
        self.upsert(node, ConvertMode::Update).await
    }

    async fn delete(&self, external_id: &str) -> Result<SyncOutcome> {
        let url = join(
            &self.base_url,
            &format!(
                "{}/{}?delete_node=true",
                urlencoding::encode(external_id),
                self.layer()?
            ),
        )?;

        let session = self.get_session().await?;
        let response = self
            .client
            .delete(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(AUTH_HEADER, session.token())
            .send()
            .await;
        self.release_quietly(session).await;

        let outcome = evaluate(response, false).await;
        match &outcome {
            SyncOutcome::Applied => info!(external_id, "Deleted record from CitySDK"),
            SyncOutcome::Rejected { status, message } => warn!(
                external_id,
                status = ?status,
                "Failed to delete record from CitySDK: {}",
                message
            ),
        }
        Ok(outcome)
    }
}

fn check_required(config: &AdapterConfig) -> Result<()> {
    let missing = config.missing_keys(&CitySdkMobility::REQUIRED_CONFIG_KEYS);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MeshError::config(format!(
            "{} is missing required settings: {}",
            CitySdkMobility::PROVIDER,
            missing.join(", ")
        )))
    }
}

fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| MeshError::config(format!("Invalid CitySDK endpoint '{}': {}", path, e)))
}

/// Turn a provider answer into an outcome. Only 2xx counts as applied;
/// with `expect_json` the body must also parse as JSON.
async fn evaluate(response: reqwest::Result<Response>, expect_json: bool) -> SyncOutcome {
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            return SyncOutcome::Rejected {
                status: None,
                message: e.to_string(),
            }
        }
    };

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return SyncOutcome::Rejected {
            status: Some(status.as_u16()),
            message: body,
        };
    }
    if expect_json {
        if let Err(e) = serde_json::from_str::<Value>(&body) {
            return SyncOutcome::Rejected {
                status: Some(status.as_u16()),
                message: format!("response is not JSON: {}", e),
            };
        }
    }
    SyncOutcome::Applied
}
