//! Record shapes of the legacy dataset.
//!
//! Records are immutable snapshots keyed by their legacy numeric id. They are
//! never written back; the migration only reads them.

use crate::config::MigrationDefaults;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node as stored by the legacy system, including its owner's contact fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyNode {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub email: String,
    /// Free-form owner name; may be blank.
    #[serde(default)]
    pub owner: String,
    pub lat: f64,
    pub lng: f64,
    /// Elevation in meters.
    #[serde(default)]
    pub alt: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    pub added: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Legacy status code (`a`, `p`, `h`, `ah`, `u`, ...).
    pub status: String,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl LegacyNode {
    /// Nodes never confirmed by their owner are not migrated.
    pub fn is_unconfirmed(&self) -> bool {
        self.status == MigrationDefaults::UNCONFIRMED_STATUS
    }

    pub fn is_hotspot(&self) -> bool {
        MigrationDefaults::HOTSPOT_STATUSES.contains(&self.status.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyDevice {
    pub id: i64,
    pub node_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Hardware model name.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub cname: String,
    /// Name of the routing protocol the device runs, e.g. `olsr`.
    #[serde(default)]
    pub routing_protocol: String,
    pub added: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Legacy interface record. `kind` is the legacy type tag (`eth`, `wifi`,
/// `bridge`, `vpn`, or anything else).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyInterface {
    pub id: i64,
    pub device_id: i64,
    pub mac_address: String,
    pub kind: String,
    #[serde(default)]
    pub cname: String,
    #[serde(default)]
    pub wireless_mode: Option<String>,
    #[serde(default)]
    pub wireless_channel: Option<String>,
    #[serde(default)]
    pub essid: Option<String>,
    #[serde(default)]
    pub bssid: Option<String>,
    #[serde(default)]
    pub ipv4_address: Option<String>,
    #[serde(default)]
    pub ipv6_address: Option<String>,
    pub added: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyLink {
    pub id: i64,
    pub from_interface_id: i64,
    pub to_interface_id: i64,
    #[serde(default)]
    pub etx: Option<f64>,
    #[serde(default)]
    pub dbm: Option<i64>,
    #[serde(default)]
    pub sync_tx: Option<i64>,
    #[serde(default)]
    pub sync_rx: Option<i64>,
    #[serde(default)]
    pub hide: bool,
}

/// A message a visitor sent to a node's owner through the legacy site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyContact {
    pub id: i64,
    pub node_id: i64,
    pub from_name: String,
    pub from_email: String,
    pub message: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub accept_language: Option<String>,
    pub date: DateTime<Utc>,
}
