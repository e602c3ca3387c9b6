//! Canonical store schema.
//!
//! Foreign keys are enforced without cascades: whoever deletes an entity
//! must first delete what depends on it. Rollback relies on this to surface
//! ordering mistakes as errors instead of silently removing rows.

pub(super) const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS statuses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS zones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    -- JSON polygon, NULL for zones without an area
    area TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    credential_hash TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    zone_id INTEGER NOT NULL REFERENCES zones(id),
    status_id INTEGER NOT NULL REFERENCES statuses(id),
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    lng REAL NOT NULL,
    lat REAL NOT NULL,
    elevation REAL,
    address TEXT,
    description TEXT NOT NULL,
    notes TEXT NOT NULL,
    added TEXT NOT NULL,
    updated TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_nodes_user ON nodes(user_id);

CREATE TABLE IF NOT EXISTS routing_protocols (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS devices (
    id INTEGER PRIMARY KEY,
    node_id INTEGER NOT NULL REFERENCES nodes(id),
    type TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    added TEXT NOT NULL,
    updated TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS device_routing_protocols (
    device_id INTEGER NOT NULL REFERENCES devices(id),
    routing_protocol_id INTEGER NOT NULL REFERENCES routing_protocols(id),
    PRIMARY KEY (device_id, routing_protocol_id)
);

CREATE TABLE IF NOT EXISTS interfaces (
    id INTEGER PRIMARY KEY,
    device_id INTEGER NOT NULL REFERENCES devices(id),
    type TEXT NOT NULL,
    mac TEXT NOT NULL,
    name TEXT NOT NULL,
    standard TEXT,
    duplex TEXT,
    mode TEXT,
    channel TEXT,
    added TEXT NOT NULL,
    updated TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS vaps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    interface_id INTEGER NOT NULL REFERENCES interfaces(id),
    essid TEXT,
    bssid TEXT
);

CREATE TABLE IF NOT EXISTS ips (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    interface_id INTEGER NOT NULL REFERENCES interfaces(id),
    address TEXT NOT NULL,
    protocol TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY,
    interface_a INTEGER NOT NULL REFERENCES interfaces(id),
    interface_b INTEGER NOT NULL REFERENCES interfaces(id),
    status TEXT NOT NULL,
    type TEXT NOT NULL,
    metric_type TEXT NOT NULL,
    metric_value REAL,
    dbm INTEGER,
    min_rate INTEGER,
    max_rate INTEGER,
    access_level INTEGER
);

CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_kind TEXT NOT NULL,
    target_id INTEGER NOT NULL,
    status TEXT NOT NULL,
    from_name TEXT NOT NULL,
    from_email TEXT NOT NULL,
    message TEXT NOT NULL,
    ip TEXT,
    user_agent TEXT,
    accept_language TEXT,
    added TEXT NOT NULL,
    updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS external_records (
    provider TEXT NOT NULL,
    node_id INTEGER NOT NULL REFERENCES nodes(id),
    external_id TEXT NOT NULL,
    updated TEXT NOT NULL,
    PRIMARY KEY (provider, node_id)
);
"#;
