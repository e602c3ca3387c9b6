//! Entities of the canonical store.

use crate::geometry::{GeoPoint, Polygon};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Free-form string attributes attached to nodes, devices and interfaces.
pub type AttributeMap = BTreeMap<String, String>;

/// Kinds of entity a migration run can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Node,
    Device,
    RoutingProtocol,
    Interface,
    Vap,
    Ip,
    Link,
    Contact,
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::User,
        EntityKind::Node,
        EntityKind::Device,
        EntityKind::RoutingProtocol,
        EntityKind::Interface,
        EntityKind::Vap,
        EntityKind::Ip,
        EntityKind::Link,
        EntityKind::Contact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Node => "node",
            EntityKind::Device => "device",
            EntityKind::RoutingProtocol => "routing_protocol",
            EntityKind::Interface => "interface",
            EntityKind::Vap => "vap",
            EntityKind::Ip => "ip",
            EntityKind::Link => "link",
            EntityKind::Contact => "contact",
        }
    }

    pub(crate) fn table(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Node => "nodes",
            EntityKind::Device => "devices",
            EntityKind::RoutingProtocol => "routing_protocols",
            EntityKind::Interface => "interfaces",
            EntityKind::Vap => "vaps",
            EntityKind::Ip => "ips",
            EntityKind::Link => "links",
            EntityKind::Contact => "contacts",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed reference to a stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.id)
    }
}

/// A canonical node status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub is_default: bool,
}

/// A geographic partition nodes are assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: i64,
    pub slug: String,
    pub name: String,
    /// Zones without an area never contain a point.
    pub area: Option<Polygon>,
}

impl Zone {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.area
            .as_ref()
            .map(|area| area.contains(point))
            .unwrap_or(false)
    }
}

/// A user derived from legacy contact fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Salted SHA-256 of the generated credential; the clear text is never stored.
    pub credential_hash: String,
    pub is_active: bool,
}

impl UserIdentity {
    /// First and last name joined by a space, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Input for creating a user; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub credential_hash: String,
}

/// A network node. The legacy id is kept as the canonical id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntity {
    pub id: i64,
    pub user_id: i64,
    pub zone_id: i64,
    pub status_id: i64,
    pub name: String,
    pub slug: String,
    pub geometry: GeoPoint,
    pub elevation: Option<f64>,
    pub address: Option<String>,
    pub description: String,
    pub notes: String,
    pub added: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub data: AttributeMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntity {
    pub id: i64,
    pub node_id: i64,
    pub kind: String,
    pub name: String,
    pub description: String,
    pub added: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub data: AttributeMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingProtocol {
    pub id: i64,
    pub name: String,
}

/// Interface type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceType {
    Ethernet,
    Wireless,
    Bridge,
    Tunnel,
    Virtual,
}

impl InterfaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceType::Ethernet => "ethernet",
            InterfaceType::Wireless => "wireless",
            InterfaceType::Bridge => "bridge",
            InterfaceType::Tunnel => "tunnel",
            InterfaceType::Virtual => "virtual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ethernet" => Some(InterfaceType::Ethernet),
            "wireless" => Some(InterfaceType::Wireless),
            "bridge" => Some(InterfaceType::Bridge),
            "tunnel" => Some(InterfaceType::Tunnel),
            "virtual" => Some(InterfaceType::Virtual),
            _ => None,
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A network interface. Type-specific fields are `None` for other types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceEntity {
    pub id: i64,
    pub device_id: i64,
    pub kind: InterfaceType,
    pub mac: String,
    pub name: String,
    /// Ethernet standard, e.g. `fast`.
    pub standard: Option<String>,
    pub duplex: Option<String>,
    /// Wireless mode, e.g. `ad-hoc`.
    pub mode: Option<String>,
    pub channel: Option<String>,
    pub added: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub data: AttributeMap,
}

/// Wireless association (virtual access point) of a wireless interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VapEntity {
    pub interface_id: i64,
    pub essid: Option<String>,
    pub bssid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpEntity {
    pub interface_id: i64,
    pub address: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntity {
    pub id: i64,
    pub interface_a: i64,
    pub interface_b: i64,
    pub status: String,
    pub kind: String,
    pub metric_type: String,
    pub metric_value: Option<f64>,
    pub dbm: Option<i64>,
    pub min_rate: Option<i64>,
    pub max_rate: Option<i64>,
    pub access_level: Option<i64>,
}

/// Delivery status of a contact message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Waiting,
    Sent,
    Error,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Waiting => "waiting",
            ContactStatus::Sent => "sent",
            ContactStatus::Error => "error",
        }
    }
}

/// An inbound message about some entity, usually a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEntry {
    pub target: EntityRef,
    pub status: ContactStatus,
    pub from_name: String,
    pub from_email: String,
    pub message: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub added: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Local node ↔ provider-side record id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecordMapping {
    pub provider: String,
    pub node_id: i64,
    pub external_id: String,
}
