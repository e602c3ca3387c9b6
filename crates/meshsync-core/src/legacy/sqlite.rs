//! Legacy dataset exported to SQLite.

use super::records::{LegacyContact, LegacyDevice, LegacyInterface, LegacyLink, LegacyNode};
use super::{LegacyBatch, LegacySource, RejectedRow};
use crate::error::{MeshError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::Path;
use tracing::{debug, warn};

/// Reads legacy records from a SQLite export.
///
/// Expected tables: `nodes`, `devices`, `interfaces`, `links`, `contacts`,
/// with column names matching the record fields (the device model and the
/// interface kind live in a `type` column). Timestamps are text, either
/// RFC 3339 or `YYYY-MM-DD HH:MM:SS`.
pub struct SqliteLegacySource {
    conn: Connection,
}

impl SqliteLegacySource {
    /// Open an export read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| MeshError::Database {
            message: format!("Failed to open legacy database {}: {}", path.display(), e),
            source: Some(e),
        })?;

        debug!("Opened legacy database {}", path.display());
        Ok(Self { conn })
    }

    /// Run `sql` and convert each row with `map`.
    ///
    /// Statement and stepping errors fail the whole read. A row `map`
    /// cannot convert is rejected on its own, keyed by the id in column 0.
    fn query_all<T>(
        &self,
        sql: &str,
        mut map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<LegacyBatch<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut batch = LegacyBatch::default();
        let mut position = 0;
        while let Some(row) = rows.next()? {
            position += 1;
            match map(row) {
                Ok(record) => batch.records.push(record),
                Err(e) => {
                    let id = row.get::<_, i64>(0).ok();
                    warn!(id = ?id, position, "Unreadable legacy row: {}", e);
                    batch.rejected.push(RejectedRow {
                        id,
                        position,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(batch)
    }
}

impl LegacySource for SqliteLegacySource {
    fn nodes(&self) -> Result<LegacyBatch<LegacyNode>> {
        self.query_all(
            "SELECT id, name, slug, email, owner, lat, lng, alt, description, notes,
                    added, updated, status, postal_code
             FROM nodes ORDER BY id",
            |row| {
                Ok(LegacyNode {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    slug: row.get(2)?,
                    email: row.get(3)?,
                    owner: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    lat: row.get(5)?,
                    lng: row.get(6)?,
                    alt: row.get(7)?,
                    description: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                    notes: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                    added: timestamp(row, 10)?,
                    updated: timestamp(row, 11)?,
                    status: row.get(12)?,
                    postal_code: row.get(13)?,
                })
            },
        )
    }

    fn devices(&self) -> Result<LegacyBatch<LegacyDevice>> {
        self.query_all(
            "SELECT id, node_id, name, description, type, cname, routing_protocol, added, updated
             FROM devices ORDER BY id",
            |row| {
                Ok(LegacyDevice {
                    id: row.get(0)?,
                    node_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    model: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    cname: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    routing_protocol: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                    added: timestamp(row, 7)?,
                    updated: timestamp(row, 8)?,
                })
            },
        )
    }

    fn interfaces(&self) -> Result<LegacyBatch<LegacyInterface>> {
        self.query_all(
            "SELECT id, device_id, mac_address, type, cname, wireless_mode, wireless_channel,
                    essid, bssid, ipv4_address, ipv6_address, added, updated
             FROM interfaces ORDER BY id",
            |row| {
                Ok(LegacyInterface {
                    id: row.get(0)?,
                    device_id: row.get(1)?,
                    mac_address: row.get(2)?,
                    kind: row.get(3)?,
                    cname: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    wireless_mode: row.get(5)?,
                    wireless_channel: row.get(6)?,
                    essid: row.get(7)?,
                    bssid: row.get(8)?,
                    ipv4_address: row.get(9)?,
                    ipv6_address: row.get(10)?,
                    added: timestamp(row, 11)?,
                    updated: timestamp(row, 12)?,
                })
            },
        )
    }

    fn links(&self) -> Result<LegacyBatch<LegacyLink>> {
        self.query_all(
            "SELECT id, from_interface_id, to_interface_id, etx, dbm, sync_tx, sync_rx, hide
             FROM links ORDER BY id",
            |row| {
                Ok(LegacyLink {
                    id: row.get(0)?,
                    from_interface_id: row.get(1)?,
                    to_interface_id: row.get(2)?,
                    etx: row.get(3)?,
                    dbm: row.get(4)?,
                    sync_tx: row.get(5)?,
                    sync_rx: row.get(6)?,
                    hide: row.get::<_, Option<bool>>(7)?.unwrap_or(false),
                })
            },
        )
    }

    fn contacts(&self) -> Result<LegacyBatch<LegacyContact>> {
        self.query_all(
            "SELECT id, node_id, from_name, from_email, message, ip, user_agent,
                    accept_language, date
             FROM contacts ORDER BY id",
            |row| {
                Ok(LegacyContact {
                    id: row.get(0)?,
                    node_id: row.get(1)?,
                    from_name: row.get(2)?,
                    from_email: row.get(3)?,
                    message: row.get(4)?,
                    ip: row.get(5)?,
                    user_agent: row.get(6)?,
                    accept_language: row.get(7)?,
                    date: timestamp(row, 8)?,
                })
            },
        )
    }
}

/// Parse a legacy timestamp column.
fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unrecognized timestamp '{}'", raw).into(),
        )
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_db() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE nodes (id INTEGER PRIMARY KEY, name TEXT, slug TEXT, email TEXT,
                owner TEXT, lat REAL, lng REAL, alt REAL, description TEXT, notes TEXT,
                added TEXT, updated TEXT, status TEXT, postal_code TEXT);
            CREATE TABLE links (id INTEGER PRIMARY KEY, from_interface_id INTEGER,
                to_interface_id INTEGER, etx REAL, dbm INTEGER, sync_tx INTEGER,
                sync_rx INTEGER, hide INTEGER);
            INSERT INTO nodes VALUES (1, 'Tower', 'tower', 'a@b.org', NULL, 41.9, 12.5, NULL,
                NULL, '', '2008-03-01 12:00:00', '2011-07-04T08:30:00+02:00', 'a', '00100');
            INSERT INTO links VALUES (4, 10, 11, 1.5, -70, 54, 36, 1);
            "#,
        )
        .unwrap();
        (dir, path)
    }

    #[test]
    fn test_reads_nodes_and_links() {
        let (_dir, path) = legacy_db();
        let source = SqliteLegacySource::open(&path).unwrap();

        let nodes = source.nodes().unwrap().records;
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].owner, "");
        assert_eq!(nodes[0].postal_code.as_deref(), Some("00100"));
        assert_eq!(nodes[0].updated.to_rfc3339(), "2011-07-04T06:30:00+00:00");

        let links = source.links().unwrap().records;
        assert!(links[0].hide);
        assert_eq!(links[0].sync_rx, Some(36));
    }

    #[test]
    fn test_unreadable_rows_are_rejected_one_by_one() {
        let (_dir, path) = legacy_db();
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO nodes VALUES (2, 'Zero', 'zero', 'z@b.org', NULL, 41.9, 12.5, NULL,
                NULL, '', '0000-00-00 00:00:00', '2011-07-04 08:30:00', 'a', NULL);
            INSERT INTO nodes VALUES (3, 'Orphan', 'orphan', NULL, NULL, 41.9, 12.5, NULL,
                NULL, '', '2008-03-01 12:00:00', '2008-03-01 12:00:00', 'a', NULL);
            "#,
        )
        .unwrap();
        drop(conn);

        let source = SqliteLegacySource::open(&path).unwrap();
        let nodes = source.nodes().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes.records.len(), 1);
        assert_eq!(nodes.records[0].id, 1);

        let rejected: Vec<_> = nodes.rejected.iter().map(|r| r.key("node")).collect();
        assert_eq!(rejected, vec!["node #2", "node #3"]);
        assert_eq!(nodes.rejected[0].position, 2);
        assert!(nodes.rejected[0].reason.contains("0000-00-00"));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let (_dir, path) = legacy_db();
        let source = SqliteLegacySource::open(&path).unwrap();
        assert!(source.devices().is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2008-03-01 12:00:00").is_some());
        assert!(parse_timestamp("2008-03-01 12:00:00.250").is_some());
        assert!(parse_timestamp("2008-03-01T12:00:00Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
