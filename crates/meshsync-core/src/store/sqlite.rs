//! SQLite-backed canonical store.

use super::entities::{
    AttributeMap, ContactEntry, DeviceEntity, EntityKind, EntityRef, ExternalRecordMapping,
    InterfaceEntity, InterfaceType, IpEntity, LinkEntity, NewUser, NodeEntity, RoutingProtocol,
    Status, UserIdentity, VapEntity, Zone,
};
use super::schema::SCHEMA;
use crate::error::{MeshError, Result};
use crate::geometry::{GeoPoint, Polygon};
use crate::sync::SyncNode;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// The destination dataset of a migration.
///
/// Every write is committed immediately; undoing a run is the job of the
/// rollback journal, not of a long-lived database transaction.
pub struct CanonicalStore {
    conn: Mutex<Connection>,
}

impl CanonicalStore {
    /// Open (or create) a store at the given path.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MeshError::io_with_path(e, parent))?;
            }
        }

        let conn = Connection::open(db_path).map_err(|e| MeshError::Database {
            message: format!("Failed to open store {}: {}", db_path.display(), e),
            source: Some(e),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::with_connection(conn)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(|e| MeshError::Database {
            message: format!("Failed to initialize store schema: {}", e),
            source: Some(e),
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| MeshError::Database {
            message: format!("Failed to lock store: {}", e),
            source: None,
        })
    }

    // Statuses and zones

    pub fn create_status(&self, slug: &str, name: &str, is_default: bool) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO statuses (slug, name, is_default) VALUES (?1, ?2, ?3)",
            params![slug, name, is_default],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn statuses(&self) -> Result<Vec<Status>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, slug, name, is_default FROM statuses ORDER BY id")?;
        let statuses = stmt
            .query_map([], |row| {
                Ok(Status {
                    id: row.get(0)?,
                    slug: row.get(1)?,
                    name: row.get(2)?,
                    is_default: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(statuses)
    }

    pub fn create_zone(&self, slug: &str, name: &str, area: Option<&Polygon>) -> Result<i64> {
        let area = area.map(serde_json::to_string).transpose()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO zones (slug, name, area) VALUES (?1, ?2, ?3)",
            params![slug, name, area],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn zones(&self) -> Result<Vec<Zone>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, slug, name, area FROM zones ORDER BY id")?;
        let zones = stmt
            .query_map([], |row| {
                let area: Option<String> = row.get(3)?;
                Ok(Zone {
                    id: row.get(0)?,
                    slug: row.get(1)?,
                    name: row.get(2)?,
                    area: area.map(|raw| parse_json(&raw, 3)).transpose()?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(zones)
    }

    // Users

    pub fn insert_user(&self, user: &NewUser) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (username, first_name, last_name, email, credential_hash, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)",
            params![
                user.username,
                user.first_name,
                user.last_name,
                user.email,
                user.credential_hash
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn username_exists(&self, username: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn user(&self, id: i64) -> Result<Option<UserIdentity>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, first_name, last_name, email, credential_hash, is_active
                 FROM users WHERE id = ?1",
                params![id],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn users(&self) -> Result<Vec<UserIdentity>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, first_name, last_name, email, credential_hash, is_active
             FROM users ORDER BY id",
        )?;
        let users = stmt
            .query_map([], map_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    // Nodes

    pub fn insert_node(&self, node: &NodeEntity) -> Result<()> {
        let data = serde_json::to_string(&node.data)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO nodes (id, user_id, zone_id, status_id, name, slug, lng, lat, elevation,
                                address, description, notes, added, updated, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                node.id,
                node.user_id,
                node.zone_id,
                node.status_id,
                node.name,
                node.slug,
                node.geometry.lng,
                node.geometry.lat,
                node.elevation,
                node.address,
                node.description,
                node.notes,
                node.added.to_rfc3339(),
                node.updated.to_rfc3339(),
                data
            ],
        )?;
        Ok(())
    }

    pub fn node(&self, id: i64) -> Result<Option<NodeEntity>> {
        let conn = self.conn()?;
        let node = conn
            .query_row(
                "SELECT id, user_id, zone_id, status_id, name, slug, lng, lat, elevation, address,
                        description, notes, added, updated, data
                 FROM nodes WHERE id = ?1",
                params![id],
                |row| {
                    Ok(NodeEntity {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        zone_id: row.get(2)?,
                        status_id: row.get(3)?,
                        name: row.get(4)?,
                        slug: row.get(5)?,
                        geometry: GeoPoint::new(row.get(6)?, row.get(7)?),
                        elevation: row.get(8)?,
                        address: row.get(9)?,
                        description: row.get(10)?,
                        notes: row.get(11)?,
                        added: timestamp(row, 12)?,
                        updated: timestamp(row, 13)?,
                        data: attributes(row, 14)?,
                    })
                },
            )
            .optional()?;
        Ok(node)
    }

    pub fn node_ids(&self) -> Result<Vec<i64>> {
        self.ids("SELECT id FROM nodes ORDER BY id")
    }

    // Devices and routing protocols

    pub fn insert_device(&self, device: &DeviceEntity) -> Result<()> {
        let data = serde_json::to_string(&device.data)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO devices (id, node_id, type, name, description, added, updated, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                device.id,
                device.node_id,
                device.kind,
                device.name,
                device.description,
                device.added.to_rfc3339(),
                device.updated.to_rfc3339(),
                data
            ],
        )?;
        Ok(())
    }

    /// First routing protocol whose name contains `name`, ignoring case.
    pub fn find_routing_protocol(&self, name: &str) -> Result<Option<RoutingProtocol>> {
        let conn = self.conn()?;
        let protocol = conn
            .query_row(
                "SELECT id, name FROM routing_protocols
                 WHERE instr(lower(name), lower(?1)) > 0
                 ORDER BY id LIMIT 1",
                params![name],
                |row| {
                    Ok(RoutingProtocol {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(protocol)
    }

    pub fn create_routing_protocol(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO routing_protocols (name) VALUES (?1)",
            params![name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn attach_routing_protocol(&self, device_id: i64, protocol_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO device_routing_protocols (device_id, routing_protocol_id)
             VALUES (?1, ?2)",
            params![device_id, protocol_id],
        )?;
        Ok(())
    }

    pub fn device_routing_protocols(&self, device_id: i64) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT r.name FROM routing_protocols r
             JOIN device_routing_protocols d ON d.routing_protocol_id = r.id
             WHERE d.device_id = ?1 ORDER BY r.name",
        )?;
        let names = stmt
            .query_map(params![device_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    // Interfaces and their sub-entities

    pub fn insert_interface(&self, interface: &InterfaceEntity) -> Result<()> {
        let data = serde_json::to_string(&interface.data)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO interfaces (id, device_id, type, mac, name, standard, duplex, mode,
                                     channel, added, updated, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                interface.id,
                interface.device_id,
                interface.kind.as_str(),
                interface.mac,
                interface.name,
                interface.standard,
                interface.duplex,
                interface.mode,
                interface.channel,
                interface.added.to_rfc3339(),
                interface.updated.to_rfc3339(),
                data
            ],
        )?;
        Ok(())
    }

    pub fn interface(&self, id: i64) -> Result<Option<InterfaceEntity>> {
        let conn = self.conn()?;
        let interface = conn
            .query_row(
                "SELECT id, device_id, type, mac, name, standard, duplex, mode, channel,
                        added, updated, data
                 FROM interfaces WHERE id = ?1",
                params![id],
                |row| {
                    let kind: String = row.get(2)?;
                    Ok(InterfaceEntity {
                        id: row.get(0)?,
                        device_id: row.get(1)?,
                        kind: InterfaceType::parse(&kind).ok_or_else(|| {
                            rusqlite::Error::FromSqlConversionFailure(
                                2,
                                Type::Text,
                                format!("unknown interface type '{}'", kind).into(),
                            )
                        })?,
                        mac: row.get(3)?,
                        name: row.get(4)?,
                        standard: row.get(5)?,
                        duplex: row.get(6)?,
                        mode: row.get(7)?,
                        channel: row.get(8)?,
                        added: timestamp(row, 9)?,
                        updated: timestamp(row, 10)?,
                        data: attributes(row, 11)?,
                    })
                },
            )
            .optional()?;
        Ok(interface)
    }

    pub fn set_interface_type(&self, id: i64, kind: InterfaceType) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE interfaces SET type = ?1, updated = ?2 WHERE id = ?3",
            params![kind.as_str(), Utc::now().to_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(MeshError::NotFound {
                kind: EntityKind::Interface.to_string(),
                id,
            });
        }
        Ok(())
    }

    pub fn insert_vap(&self, vap: &VapEntity) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO vaps (interface_id, essid, bssid) VALUES (?1, ?2, ?3)",
            params![vap.interface_id, vap.essid, vap.bssid],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_ip(&self, ip: &IpEntity) -> Result<i64> {
        let protocol = if ip.address.is_ipv4() { "ipv4" } else { "ipv6" };
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO ips (interface_id, address, protocol) VALUES (?1, ?2, ?3)",
            params![ip.interface_id, ip.address.to_string(), protocol],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // Links and contacts

    pub fn insert_link(&self, link: &LinkEntity) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO links (id, interface_a, interface_b, status, type, metric_type,
                                metric_value, dbm, min_rate, max_rate, access_level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                link.id,
                link.interface_a,
                link.interface_b,
                link.status,
                link.kind,
                link.metric_type,
                link.metric_value,
                link.dbm,
                link.min_rate,
                link.max_rate,
                link.access_level
            ],
        )?;
        Ok(())
    }

    pub fn link(&self, id: i64) -> Result<Option<LinkEntity>> {
        let conn = self.conn()?;
        let link = conn
            .query_row(
                "SELECT id, interface_a, interface_b, status, type, metric_type, metric_value,
                        dbm, min_rate, max_rate, access_level
                 FROM links WHERE id = ?1",
                params![id],
                |row| {
                    Ok(LinkEntity {
                        id: row.get(0)?,
                        interface_a: row.get(1)?,
                        interface_b: row.get(2)?,
                        status: row.get(3)?,
                        kind: row.get(4)?,
                        metric_type: row.get(5)?,
                        metric_value: row.get(6)?,
                        dbm: row.get(7)?,
                        min_rate: row.get(8)?,
                        max_rate: row.get(9)?,
                        access_level: row.get(10)?,
                    })
                },
            )
            .optional()?;
        Ok(link)
    }

    pub fn insert_contact(&self, contact: &ContactEntry) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO contacts (target_kind, target_id, status, from_name, from_email, message,
                                   ip, user_agent, accept_language, added, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                contact.target.kind.as_str(),
                contact.target.id,
                contact.status.as_str(),
                contact.from_name,
                contact.from_email,
                contact.message,
                contact.ip,
                contact.user_agent,
                contact.accept_language,
                contact.added.to_rfc3339(),
                contact.updated.to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // Generic helpers

    /// Whether an entity with this id exists.
    pub fn exists(&self, entity: EntityRef) -> Result<bool> {
        let conn = self.conn()?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?1", entity.kind.table());
        let count: i64 = conn.query_row(&sql, params![entity.id], |row| row.get(0))?;
        Ok(count > 0)
    }

    pub fn count(&self, kind: EntityKind) -> Result<usize> {
        let conn = self.conn()?;
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete one entity together with its association rows.
    ///
    /// Entities that other entities still reference fail with a foreign key
    /// error; callers delete dependents first.
    pub fn delete(&self, entity: EntityRef) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        match entity.kind {
            EntityKind::Device => {
                tx.execute(
                    "DELETE FROM device_routing_protocols WHERE device_id = ?1",
                    params![entity.id],
                )?;
            }
            EntityKind::RoutingProtocol => {
                tx.execute(
                    "DELETE FROM device_routing_protocols WHERE routing_protocol_id = ?1",
                    params![entity.id],
                )?;
            }
            EntityKind::Node => {
                tx.execute(
                    "DELETE FROM external_records WHERE node_id = ?1",
                    params![entity.id],
                )?;
            }
            _ => {}
        }

        let sql = format!("DELETE FROM {} WHERE id = ?1", entity.kind.table());
        let deleted = tx.execute(&sql, params![entity.id])?;
        if deleted == 0 {
            return Err(MeshError::NotFound {
                kind: entity.kind.to_string(),
                id: entity.id,
            });
        }

        tx.commit()?;
        debug!("Deleted {}", entity);
        Ok(())
    }

    fn ids(&self, sql: &str) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    // External record mappings

    pub fn external_id(&self, provider: &str, node_id: i64) -> Result<Option<String>> {
        let conn = self.conn()?;
        let external_id = conn
            .query_row(
                "SELECT external_id FROM external_records WHERE provider = ?1 AND node_id = ?2",
                params![provider, node_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(external_id)
    }

    pub fn record_external_id(&self, mapping: &ExternalRecordMapping) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO external_records (provider, node_id, external_id, updated)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                mapping.provider,
                mapping.node_id,
                mapping.external_id,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Forget a provider-side record. Returns whether a mapping existed.
    pub fn remove_external_id(&self, provider: &str, external_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM external_records WHERE provider = ?1 AND external_id = ?2",
            params![provider, external_id],
        )?;
        Ok(removed > 0)
    }

    /// Everything an adapter needs to push one node to `provider`.
    pub fn sync_node(&self, provider: &str, node_id: i64) -> Result<SyncNode> {
        let conn = self.conn()?;
        let node = conn
            .query_row(
                "SELECT n.id, n.name, n.slug, n.lng, n.lat, n.elevation, n.address,
                        n.description, n.data, s.slug, u.first_name, u.last_name, e.external_id
                 FROM nodes n
                 JOIN statuses s ON s.id = n.status_id
                 JOIN users u ON u.id = n.user_id
                 LEFT JOIN external_records e ON e.node_id = n.id AND e.provider = ?1
                 WHERE n.id = ?2",
                params![provider, node_id],
                |row| {
                    let description: String = row.get(7)?;
                    let first_name: String = row.get(10)?;
                    let last_name: String = row.get(11)?;
                    let owner = format!("{} {}", first_name, last_name).trim().to_string();
                    Ok(SyncNode {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        slug: row.get(2)?,
                        geometry: GeoPoint::new(row.get(3)?, row.get(4)?),
                        elevation: row.get(5)?,
                        address: row.get(6)?,
                        description: Some(description).filter(|d| !d.is_empty()),
                        data: attributes(row, 8)?,
                        status: row.get(9)?,
                        owner: Some(owner).filter(|o| !o.is_empty()),
                        external_id: row.get(12)?,
                    })
                },
            )
            .optional()?;

        node.ok_or_else(|| MeshError::NotFound {
            kind: EntityKind::Node.to_string(),
            id: node_id,
        })
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserIdentity> {
    Ok(UserIdentity {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        credential_hash: row.get(5)?,
        is_active: row.get(6)?,
    })
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn attributes(row: &Row<'_>, idx: usize) -> rusqlite::Result<AttributeMap> {
    let raw: String = row.get(idx)?;
    parse_json(&raw, idx)
}

fn parse_json<T: DeserializeOwned>(raw: &str, idx: usize) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_node() -> CanonicalStore {
        let store = CanonicalStore::open_in_memory().unwrap();
        let status = store.create_status("active", "Active", true).unwrap();
        let zone = store.create_zone("rome", "Rome", None).unwrap();
        let user = store
            .insert_user(&NewUser {
                username: "jdoe".into(),
                first_name: "John".into(),
                last_name: "Doe".into(),
                email: "john@example.org".into(),
                credential_hash: "x".into(),
            })
            .unwrap();
        store
            .insert_node(&NodeEntity {
                id: 10,
                user_id: user,
                zone_id: zone,
                status_id: status,
                name: "Rooftop".into(),
                slug: "rooftop".into(),
                geometry: GeoPoint::new(12.5, 41.9),
                elevation: Some(30.0),
                address: None,
                description: String::new(),
                notes: String::new(),
                added: Utc::now(),
                updated: Utc::now(),
                data: AttributeMap::new(),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_node_roundtrip_and_sync_view() {
        let store = store_with_node();
        let node = store.node(10).unwrap().unwrap();
        assert_eq!(node.slug, "rooftop");

        let view = store.sync_node("citysdk", 10).unwrap();
        assert_eq!(view.status, "active");
        assert_eq!(view.owner.as_deref(), Some("John Doe"));
        assert_eq!(view.description, None);
        assert_eq!(view.external_id, None);

        store
            .record_external_id(&ExternalRecordMapping {
                provider: "citysdk".into(),
                node_id: 10,
                external_id: "rooftop".into(),
            })
            .unwrap();
        assert_eq!(
            store.sync_node("citysdk", 10).unwrap().external_id.as_deref(),
            Some("rooftop")
        );
        assert_eq!(store.sync_node("other", 10).unwrap().external_id, None);
    }

    #[test]
    fn test_delete_respects_foreign_keys() {
        let store = store_with_node();
        let user_id = store.users().unwrap()[0].id;

        let err = store
            .delete(EntityRef::new(EntityKind::User, user_id))
            .unwrap_err();
        assert!(matches!(err, MeshError::Database { .. }));

        store.delete(EntityRef::new(EntityKind::Node, 10)).unwrap();
        store
            .delete(EntityRef::new(EntityKind::User, user_id))
            .unwrap();
        assert_eq!(store.count(EntityKind::User).unwrap(), 0);
    }

    #[test]
    fn test_delete_missing_entity_is_not_found() {
        let store = CanonicalStore::open_in_memory().unwrap();
        let err = store
            .delete(EntityRef::new(EntityKind::Link, 99))
            .unwrap_err();
        assert!(matches!(err, MeshError::NotFound { id: 99, .. }));
    }

    #[test]
    fn test_find_routing_protocol_is_case_insensitive_substring() {
        let store = CanonicalStore::open_in_memory().unwrap();
        store.create_routing_protocol("OLSRd").unwrap();
        assert!(store.find_routing_protocol("olsr").unwrap().is_some());
        assert!(store.find_routing_protocol("batman").unwrap().is_none());
    }

    #[test]
    fn test_zone_area_roundtrip() {
        let store = CanonicalStore::open_in_memory().unwrap();
        let area = Polygon::from_bbox(12.0, 41.0, 13.0, 42.0);
        store.create_zone("rome", "Rome", Some(&area)).unwrap();
        let zones = store.zones().unwrap();
        assert_eq!(zones[0].area.as_ref(), Some(&area));
        assert!(zones[0].contains(&GeoPoint::new(12.5, 41.9)));
    }
}
