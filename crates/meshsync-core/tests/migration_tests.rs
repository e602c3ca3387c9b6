//! Integration tests for the migration pipeline.
//!
//! Each test builds an in-memory canonical store with two statuses and two
//! zones, and migrates a small legacy dataset into it.

use chrono::{TimeZone, Utc};
use meshsync_core::legacy::{
    LegacyBatch, LegacyContact, LegacyDevice, LegacyInterface, LegacyLink, LegacyNode,
};
use meshsync_core::store::InterfaceType;
use meshsync_core::{
    CancellationToken, CanonicalStore, DecisionProvider, EntityKind, EntityRef, GeoPoint,
    LegacyDataset, LegacySource, MeshError, MigrationConfig, MigrationPipeline, Phase, Polygon,
    Question, RollbackReason, RunDisposition, ScriptedDecisions, SqliteLegacySource,
};
use std::collections::BTreeMap;

struct Fixture {
    store: CanonicalStore,
    zone_a: i64,
    zone_b: i64,
}

fn fixture() -> Fixture {
    let store = CanonicalStore::open_in_memory().unwrap();
    store.create_status("active", "Active", true).unwrap();
    store.create_status("planned", "Planned", false).unwrap();
    let zone_a = store
        .create_zone("a", "A", Some(&Polygon::from_bbox(12.0, 41.5, 13.0, 42.5)))
        .unwrap();
    let zone_b = store
        .create_zone("b", "B", Some(&Polygon::from_bbox(9.0, 45.0, 9.5, 45.8)))
        .unwrap();
    Fixture {
        store,
        zone_a,
        zone_b,
    }
}

fn node(id: i64, email: &str, owner: &str, lng: f64, lat: f64, status: &str) -> LegacyNode {
    LegacyNode {
        id,
        name: format!("Node {}", id),
        slug: format!("node-{}", id),
        email: email.to_string(),
        owner: owner.to_string(),
        lat,
        lng,
        alt: Some(25.0),
        description: String::new(),
        notes: String::new(),
        added: Utc.with_ymd_and_hms(2009, 5, 1, 10, 0, 0).unwrap(),
        updated: Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap(),
        status: status.to_string(),
        postal_code: None,
    }
}

fn device(id: i64, node_id: i64, protocol: &str) -> LegacyDevice {
    LegacyDevice {
        id,
        node_id,
        name: format!("device{}", id),
        description: String::new(),
        model: "NanoStation M5".to_string(),
        cname: String::new(),
        routing_protocol: protocol.to_string(),
        added: Utc::now(),
        updated: Utc::now(),
    }
}

fn interface(id: i64, device_id: i64, kind: &str) -> LegacyInterface {
    LegacyInterface {
        id,
        device_id,
        mac_address: format!("00:11:22:33:44:{:02x}", id % 256),
        kind: kind.to_string(),
        cname: format!("{}-interface-{}", kind, id),
        wireless_mode: None,
        wireless_channel: None,
        essid: None,
        bssid: None,
        ipv4_address: None,
        ipv6_address: None,
        added: Utc::now(),
        updated: Utc::now(),
    }
}

fn link(id: i64, from: i64, to: i64) -> LegacyLink {
    LegacyLink {
        id,
        from_interface_id: from,
        to_interface_id: to,
        etx: Some(1.2),
        dbm: Some(-70),
        sync_tx: Some(54),
        sync_rx: Some(36),
        hide: false,
    }
}

fn contact(id: i64, node_id: i64, from_email: &str) -> LegacyContact {
    LegacyContact {
        id,
        node_id,
        from_name: "Visitor".to_string(),
        from_email: from_email.to_string(),
        message: "Is this node still online?".to_string(),
        ip: Some("192.0.2.10".to_string()),
        user_agent: None,
        accept_language: None,
        date: Utc.with_ymd_and_hms(2012, 3, 4, 5, 6, 7).unwrap(),
    }
}

/// Three nodes (one unconfirmed) with devices, interfaces, links and contacts.
fn dataset() -> LegacyDataset {
    let mut hotspot = node(2, "bob@example.org", "", 12.6, 42.0, "h");
    hotspot.postal_code = Some("00100".to_string());

    let mut wifi = interface(101, 11, "wifi");
    wifi.essid = Some("ninux.org".to_string());
    wifi.wireless_mode = Some("ad-hoc".to_string());
    wifi.ipv4_address = Some("not-an-ip".to_string());
    wifi.ipv6_address = Some("fd00::1".to_string());

    let mut eth = interface(100, 10, "eth");
    eth.ipv4_address = Some(" 10.0.0.1 ".to_string());

    let mut hidden = link(1000, 100, 101);
    hidden.hide = true;

    LegacyDataset {
        nodes: vec![
            node(1, "jane@example.org", "jane roe", 12.5, 41.9, "a"),
            hotspot,
            node(3, "carl@example.org", "Carl", 12.7, 41.8, "u"),
        ],
        devices: vec![device(10, 1, "olsr"), device(11, 2, "OLSR"), device(12, 3, "")],
        interfaces: vec![eth, wifi, interface(102, 12, "eth")],
        links: vec![hidden, link(1001, 100, 999), link(1002, 101, 102)],
        contacts: vec![
            contact(1, 1, "visitor@example.org"),
            contact(2, 3, "visitor@example.org"),
            contact(3, 2, "nope"),
        ],
    }
}

fn count_all(store: &CanonicalStore) -> usize {
    EntityKind::ALL
        .iter()
        .map(|kind| store.count(*kind).unwrap())
        .sum()
}

fn zone_questions(decisions: &ScriptedDecisions) -> usize {
    decisions
        .asked()
        .iter()
        .filter(|q| matches!(q, Question::ChooseZone { .. }))
        .count()
}

#[test]
fn test_full_run_is_kept() {
    let f = fixture();
    let mut decisions = ScriptedDecisions::default();
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset(), &mut decisions)
        .unwrap();

    assert!(outcome.is_kept());
    let report = &outcome.report;

    let users = report.phase(Phase::Users).unwrap();
    assert_eq!(users.saved, 3);

    let nodes = report.phase(Phase::Nodes).unwrap();
    assert_eq!((nodes.saved, nodes.skipped, nodes.failed()), (2, 1, 0));

    let devices = report.phase(Phase::Devices).unwrap();
    assert_eq!((devices.saved, devices.skipped), (2, 1));
    assert_eq!(f.store.count(EntityKind::RoutingProtocol).unwrap(), 1);
    assert_eq!(f.store.device_routing_protocols(11).unwrap(), vec!["olsr"]);

    let interfaces = report.phase(Phase::Interfaces).unwrap();
    assert_eq!((interfaces.saved, interfaces.skipped), (2, 1));
    assert_eq!(report.phase(Phase::Vaps).unwrap().saved, 1);
    let ipv4 = report.phase(Phase::Ipv4).unwrap();
    assert_eq!((ipv4.saved, ipv4.failed()), (1, 1));
    assert_eq!(ipv4.failures[0].key, "interface #101");
    assert_eq!(report.phase(Phase::Ipv6).unwrap().saved, 1);

    let links = report.phase(Phase::Links).unwrap();
    assert_eq!((links.saved, links.skipped, links.failed()), (1, 1, 1));
    assert!(matches!(
        links.failures[0].error,
        MeshError::NotFound { id: 999, .. }
    ));

    let contacts = report.phase(Phase::Contacts).unwrap();
    assert_eq!((contacts.saved, contacts.skipped, contacts.failed()), (1, 1, 1));

    // only the confirmation gate was asked
    assert_eq!(decisions.asked().len(), 1);
    assert_eq!(zone_questions(&decisions), 0);

    let hotspot = f.store.node(2).unwrap().unwrap();
    assert_eq!(hotspot.data.get("is_hotspot").map(String::as_str), Some("true"));
    assert_eq!(hotspot.data.get("postal_code").map(String::as_str), Some("00100"));
    assert_eq!(hotspot.zone_id, f.zone_a);

    // the ethernet endpoint of the link was retyped
    let eth = f.store.interface(100).unwrap().unwrap();
    assert_eq!(eth.kind, InterfaceType::Wireless);
    assert_eq!(eth.name.chars().count(), 10);

    // sync tx 54 / rx 36 become a rate range
    let hidden = f.store.link(1000).unwrap().unwrap();
    assert_eq!((hidden.min_rate, hidden.max_rate), (Some(36), Some(54)));
    assert_eq!(hidden.access_level, Some(3));
    assert_eq!(hidden.metric_value, Some(1.2));
}

#[test]
fn test_link_rates_with_one_side_missing() {
    let f = fixture();
    let mut one_sided = link(1000, 100, 101);
    one_sided.sync_tx = None;
    let dataset = LegacyDataset {
        nodes: vec![node(1, "a@example.org", "", 12.5, 41.9, "a")],
        devices: vec![device(10, 1, "")],
        interfaces: vec![interface(100, 10, "wifi"), interface(101, 10, "wifi")],
        links: vec![one_sided],
        ..Default::default()
    };
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset, &mut ScriptedDecisions::default())
        .unwrap();

    assert!(outcome.is_kept());
    let stored = f.store.link(1000).unwrap().unwrap();
    assert_eq!((stored.min_rate, stored.max_rate), (Some(36), Some(36)));
}

#[test]
fn test_unconfirmed_nodes_are_never_created() {
    let f = fixture();
    let dataset = LegacyDataset {
        nodes: vec![
            node(1, "a@example.org", "", 12.5, 41.9, "u"),
            node(2, "b@example.org", "", 12.5, 41.9, "a"),
        ],
        ..Default::default()
    };
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset, &mut ScriptedDecisions::default())
        .unwrap();

    assert!(outcome.is_kept());
    assert!(f.store.node(1).unwrap().is_none());
    assert!(f.store.node(2).unwrap().is_some());
}

#[test]
fn test_username_collisions_get_numeric_suffixes() {
    let f = fixture();
    let dataset = LegacyDataset {
        nodes: vec![
            node(1, "jdoe@example.org", "jdoe", 12.5, 41.9, "a"),
            node(2, "john.doe@example.net", "JDoe", 12.5, 41.9, "a"),
            node(3, "jd@example.com", "jdoe", 12.5, 41.9, "a"),
            node(4, "JDOE@example.org", "", 12.5, 41.9, "a"),
        ],
        ..Default::default()
    };
    MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset, &mut ScriptedDecisions::default())
        .unwrap();

    let usernames: Vec<String> = f
        .store
        .users()
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(usernames, vec!["jdoe", "jdoe2", "jdoe3"]);

    // node 4 shares its owner with node 1
    let first = f.store.node(1).unwrap().unwrap();
    let fourth = f.store.node(4).unwrap().unwrap();
    assert_eq!(first.user_id, fourth.user_id);
}

#[test]
fn test_point_in_single_zone_is_assigned_without_prompt() {
    let f = fixture();
    let dataset = LegacyDataset {
        nodes: vec![node(1, "a@example.org", "", 12.50, 41.90, "a")],
        ..Default::default()
    };
    let mut decisions = ScriptedDecisions::default();
    MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset, &mut decisions)
        .unwrap();

    assert_eq!(f.store.node(1).unwrap().unwrap().zone_id, f.zone_a);
    assert_eq!(zone_questions(&decisions), 0);
}

#[test]
fn test_point_outside_every_zone() {
    let dataset = LegacyDataset {
        nodes: vec![node(1, "a@example.org", "", -3.7, 40.4, "a")],
        ..Default::default()
    };

    let f = fixture();
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset, &mut ScriptedDecisions::default())
        .unwrap();
    assert_eq!(outcome.report.phase(Phase::Nodes).unwrap().skipped, 1);
    assert!(f.store.node(1).unwrap().is_none());

    let f = fixture();
    let config = MigrationConfig {
        default_zone: Some(f.zone_b),
        ..Default::default()
    };
    MigrationPipeline::new(&f.store, config)
        .run(&dataset, &mut ScriptedDecisions::default())
        .unwrap();
    assert_eq!(f.store.node(1).unwrap().unwrap().zone_id, f.zone_b);
}

#[test]
fn test_overlapping_zones_ask_the_operator() {
    let f = fixture();
    let inner = f
        .store
        .create_zone("c", "C", Some(&Polygon::from_bbox(12.4, 41.8, 12.6, 42.0)))
        .unwrap();
    let dataset = LegacyDataset {
        nodes: vec![node(1, "a@example.org", "", 12.5, 41.9, "a")],
        ..Default::default()
    };

    let mut decisions =
        ScriptedDecisions::new(vec!["what".to_string(), inner.to_string(), "y".to_string()]);
    MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset, &mut decisions)
        .unwrap();

    assert_eq!(f.store.node(1).unwrap().unwrap().zone_id, inner);
    assert_eq!(zone_questions(&decisions), 2);
}

#[test]
fn test_status_mapping_is_applied() {
    let f = fixture();
    let mapping = BTreeMap::from([
        ("p".to_string(), "planned".to_string()),
        ("default".to_string(), "active".to_string()),
    ]);
    let config = MigrationConfig {
        status_mapping: Some(mapping),
        default_zone: None,
    };
    let dataset = LegacyDataset {
        nodes: vec![
            node(1, "a@example.org", "", 12.5, 41.9, "p"),
            node(2, "a@example.org", "", 12.5, 41.9, "x"),
        ],
        ..Default::default()
    };
    MigrationPipeline::new(&f.store, config)
        .run(&dataset, &mut ScriptedDecisions::default())
        .unwrap();

    let statuses = f.store.statuses().unwrap();
    let id_of = |slug: &str| statuses.iter().find(|s| s.slug == slug).unwrap().id;
    assert_eq!(f.store.node(1).unwrap().unwrap().status_id, id_of("planned"));
    assert_eq!(f.store.node(2).unwrap().unwrap().status_id, id_of("active"));
}

#[test]
fn test_unknown_mapped_status_fails_before_any_write() {
    let f = fixture();
    let config = MigrationConfig {
        status_mapping: Some(BTreeMap::from([
            ("a".to_string(), "retired".to_string()),
            ("default".to_string(), "active".to_string()),
        ])),
        default_zone: None,
    };
    let err = MigrationPipeline::new(&f.store, config)
        .run(&dataset(), &mut ScriptedDecisions::default())
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(count_all(&f.store), 0);
}

#[test]
fn test_unknown_default_zone_fails_before_any_write() {
    let f = fixture();
    let config = MigrationConfig {
        status_mapping: None,
        default_zone: Some(42),
    };
    let err = MigrationPipeline::new(&f.store, config)
        .run(&dataset(), &mut ScriptedDecisions::default())
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(count_all(&f.store), 0);
}

#[test]
fn test_rejection_rolls_back_everything() {
    let f = fixture();
    let mut decisions = ScriptedDecisions::new(["maybe", "n"]);
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset(), &mut decisions)
        .unwrap();

    match outcome.disposition {
        RunDisposition::RolledBack { reason, report } => {
            assert_eq!(reason, RollbackReason::Rejected);
            assert!(report.is_complete());
            assert!(report.total_deleted() > 0);
        }
        RunDisposition::Kept => panic!("run should have been rolled back"),
    }
    assert_eq!(count_all(&f.store), 0);
    // counts of the run are still reported
    assert_eq!(outcome.report.phase(Phase::Nodes).unwrap().saved, 2);
}

/// A legacy source whose contacts table cannot be read.
struct BrokenContacts(LegacyDataset);

impl LegacySource for BrokenContacts {
    fn nodes(&self) -> meshsync_core::Result<LegacyBatch<LegacyNode>> {
        self.0.nodes()
    }
    fn devices(&self) -> meshsync_core::Result<LegacyBatch<LegacyDevice>> {
        self.0.devices()
    }
    fn interfaces(&self) -> meshsync_core::Result<LegacyBatch<LegacyInterface>> {
        self.0.interfaces()
    }
    fn links(&self) -> meshsync_core::Result<LegacyBatch<LegacyLink>> {
        self.0.links()
    }
    fn contacts(&self) -> meshsync_core::Result<LegacyBatch<LegacyContact>> {
        Err(MeshError::Other("legacy database went away".into()))
    }
}

#[test]
fn test_fatal_error_rolls_back_everything() {
    let f = fixture();
    let mut decisions = ScriptedDecisions::default();
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&BrokenContacts(dataset()), &mut decisions)
        .unwrap();

    match &outcome.disposition {
        RunDisposition::RolledBack { reason, .. } => {
            assert!(matches!(reason, RollbackReason::Fatal(msg) if msg.contains("went away")));
        }
        RunDisposition::Kept => panic!("run should have been rolled back"),
    }
    assert!(decisions.asked().is_empty());
    assert_eq!(count_all(&f.store), 0);
}

/// Removes a link behind the pipeline's back, then rejects the run.
struct Saboteur<'a> {
    store: &'a CanonicalStore,
}

impl DecisionProvider for Saboteur<'_> {
    fn ask(&mut self, question: &Question) -> Option<String> {
        if let Question::ConfirmRun { .. } = question {
            self.store
                .delete(EntityRef::new(EntityKind::Link, 1000))
                .unwrap();
            return Some("n".to_string());
        }
        Some(String::new())
    }
}

#[test]
fn test_rollback_is_best_effort() {
    let f = fixture();
    let mut decisions = Saboteur { store: &f.store };
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset(), &mut decisions)
        .unwrap();

    let RunDisposition::RolledBack { report, .. } = outcome.disposition else {
        panic!("run should have been rolled back");
    };
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].entity, EntityRef::new(EntityKind::Link, 1000));
    assert_eq!(count_all(&f.store), 0);
}

/// Interrupts the run while the operator is choosing a zone.
struct InterruptingDecisions {
    token: CancellationToken,
}

impl DecisionProvider for InterruptingDecisions {
    fn ask(&mut self, question: &Question) -> Option<String> {
        match question {
            Question::ChooseZone { candidates, .. } => {
                self.token.cancel();
                Some(candidates[0].0.to_string())
            }
            Question::ConfirmRun { .. } => panic!("cancelled run must not reach the gate"),
        }
    }
}

#[test]
fn test_cancellation_rolls_back_at_phase_boundary() {
    let f = fixture();
    f.store
        .create_zone("c", "C", Some(&Polygon::from_bbox(12.4, 41.8, 12.6, 42.0)))
        .unwrap();
    let token = CancellationToken::new();
    let mut decisions = InterruptingDecisions {
        token: token.clone(),
    };

    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .with_cancellation(token)
        .run(&dataset(), &mut decisions)
        .unwrap();

    match outcome.disposition {
        RunDisposition::RolledBack { reason, .. } => assert_eq!(reason, RollbackReason::Cancelled),
        RunDisposition::Kept => panic!("run should have been rolled back"),
    }
    // the nodes phase finished, the devices phase never started
    assert!(outcome.report.phase(Phase::Nodes).is_some());
    assert!(outcome.report.phase(Phase::Devices).is_none());
    assert_eq!(count_all(&f.store), 0);
}

#[test]
fn test_invalid_coordinates_fail_only_that_node() {
    let f = fixture();
    let dataset = LegacyDataset {
        nodes: vec![
            node(1, "a@example.org", "", 12.5, 141.9, "a"),
            node(2, "a@example.org", "", 12.5, 41.9, "a"),
        ],
        ..Default::default()
    };
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset, &mut ScriptedDecisions::default())
        .unwrap();

    let nodes = outcome.report.phase(Phase::Nodes).unwrap();
    assert_eq!((nodes.saved, nodes.failed()), (1, 1));
    assert_eq!(nodes.failures[0].key, "node #1");
    assert_eq!(
        f.store.node(2).unwrap().unwrap().geometry,
        GeoPoint::new(12.5, 41.9)
    );
}

#[test]
fn test_closed_input_at_confirmation_rolls_back() {
    let f = fixture();
    let mut decisions = ScriptedDecisions::default().then_closed();
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset(), &mut decisions)
        .unwrap();

    match &outcome.disposition {
        RunDisposition::RolledBack { reason, .. } => {
            assert!(
                matches!(reason, RollbackReason::Fatal(msg) if msg.contains("run confirmation"))
            );
        }
        RunDisposition::Kept => panic!("closed input must not keep the run"),
    }
    assert_eq!(decisions.asked().len(), 1);
    assert_eq!(count_all(&f.store), 0);
}

#[test]
fn test_closed_input_mid_phase_keeps_partial_counts() {
    let f = fixture();
    f.store
        .create_zone("c", "C", Some(&Polygon::from_bbox(12.4, 41.8, 12.6, 42.0)))
        .unwrap();
    let dataset = LegacyDataset {
        nodes: vec![
            // only in zone A
            node(1, "a@example.org", "", 12.9, 42.4, "a"),
            // in zones A and C
            node(2, "b@example.org", "", 12.5, 41.9, "a"),
        ],
        ..Default::default()
    };
    let mut decisions = ScriptedDecisions::default().then_closed();
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&dataset, &mut decisions)
        .unwrap();

    match &outcome.disposition {
        RunDisposition::RolledBack { reason, .. } => {
            assert!(matches!(reason, RollbackReason::Fatal(msg) if msg.contains("node #2")));
        }
        RunDisposition::Kept => panic!("closed input must not keep the run"),
    }
    let nodes = outcome.report.phase(Phase::Nodes).unwrap();
    assert_eq!((nodes.retrieved, nodes.saved), (1, 1));
    assert!(outcome.report.phase(Phase::Devices).is_none());
    assert_eq!(count_all(&f.store), 0);
}

#[test]
fn test_unreadable_legacy_row_fails_only_that_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.sqlite");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE nodes (id INTEGER PRIMARY KEY, name TEXT, slug TEXT, email TEXT,
            owner TEXT, lat REAL, lng REAL, alt REAL, description TEXT, notes TEXT,
            added TEXT, updated TEXT, status TEXT, postal_code TEXT);
        CREATE TABLE devices (id INTEGER PRIMARY KEY, node_id INTEGER, name TEXT,
            description TEXT, type TEXT, cname TEXT, routing_protocol TEXT,
            added TEXT, updated TEXT);
        CREATE TABLE interfaces (id INTEGER PRIMARY KEY, device_id INTEGER, mac_address TEXT,
            type TEXT, cname TEXT, wireless_mode TEXT, wireless_channel TEXT, essid TEXT,
            bssid TEXT, ipv4_address TEXT, ipv6_address TEXT, added TEXT, updated TEXT);
        CREATE TABLE links (id INTEGER PRIMARY KEY, from_interface_id INTEGER,
            to_interface_id INTEGER, etx REAL, dbm INTEGER, sync_tx INTEGER,
            sync_rx INTEGER, hide INTEGER);
        CREATE TABLE contacts (id INTEGER PRIMARY KEY, node_id INTEGER, from_name TEXT,
            from_email TEXT, message TEXT, ip TEXT, user_agent TEXT, accept_language TEXT,
            date TEXT);
        INSERT INTO nodes VALUES (1, 'Tower', 'tower', 'jane@example.org', 'Jane Roe',
            41.9, 12.5, NULL, NULL, NULL, '2008-03-01 12:00:00', '2008-03-01 12:00:00',
            'a', NULL);
        INSERT INTO nodes VALUES (2, 'Zero', 'zero', 'zero@example.org', NULL,
            41.9, 12.5, NULL, NULL, NULL, '0000-00-00 00:00:00', '2008-03-01 12:00:00',
            'a', NULL);
        INSERT INTO devices VALUES (20, 2, 'radio', NULL, NULL, NULL, NULL,
            '2008-03-01 12:00:00', '2008-03-01 12:00:00');
        "#,
    )
    .unwrap();
    drop(conn);

    let f = fixture();
    let source = SqliteLegacySource::open(&path).unwrap();
    let outcome = MigrationPipeline::new(&f.store, MigrationConfig::default())
        .run(&source, &mut ScriptedDecisions::default())
        .unwrap();

    assert!(outcome.is_kept());
    assert!(f.store.node(1).unwrap().is_some());
    assert!(f.store.node(2).unwrap().is_none());

    let nodes = outcome.report.phase(Phase::Nodes).unwrap();
    assert_eq!((nodes.retrieved, nodes.saved, nodes.failed()), (2, 1, 1));
    assert_eq!(nodes.failures[0].key, "node #2");
    assert!(matches!(nodes.failures[0].error, MeshError::Validation { .. }));

    // the device of the unreadable node has no parent
    let devices = outcome.report.phase(Phase::Devices).unwrap();
    assert!(matches!(
        devices.failures[0].error,
        MeshError::NotFound { id: 2, .. }
    ));
}
