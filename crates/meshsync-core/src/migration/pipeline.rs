//! The migration run: phases, confirmation gate and rollback.

use super::journal::{RollbackJournal, RollbackManager, RollbackReport};
use super::report::{MigrationReport, Phase, PhaseReport};
use super::spatial::{SpatialLayerResolver, ZoneAssignment};
use super::status::StatusMapper;
use super::users::UserResolver;
use crate::cancel::CancellationToken;
use crate::config::{MigrationConfig, MigrationDefaults};
use crate::decision::{DecisionProvider, Question};
use crate::error::{MeshError, Result};
use crate::geometry::GeoPoint;
use crate::legacy::{
    LegacyBatch, LegacyContact, LegacyDevice, LegacyInterface, LegacyLink, LegacyNode,
    LegacySource, RejectedRow,
};
use crate::store::{
    AttributeMap, CanonicalStore, ContactEntry, ContactStatus, DeviceEntity, EntityKind,
    EntityRef, InterfaceEntity, InterfaceType, IpEntity, LinkEntity, NewUser, NodeEntity,
    VapEntity,
};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::LazyLock;
use tracing::{debug, error, info, warn};

static MAC_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").unwrap());

/// Why a run was rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackReason {
    /// An unexpected error aborted the run.
    Fatal(String),
    Cancelled,
    /// The operator declined to keep the results.
    Rejected,
}

/// What happened to the data written by a run.
#[derive(Debug)]
pub enum RunDisposition {
    Kept,
    RolledBack {
        reason: RollbackReason,
        report: RollbackReport,
    },
}

#[derive(Debug)]
pub struct MigrationOutcome {
    pub report: MigrationReport,
    pub disposition: RunDisposition,
}

impl MigrationOutcome {
    pub fn is_kept(&self) -> bool {
        matches!(self.disposition, RunDisposition::Kept)
    }
}

/// Migrates a legacy dataset into a [`CanonicalStore`].
///
/// Configuration problems are returned as errors before anything is
/// written. Every other outcome, including a rolled back run, is an
/// `Ok(MigrationOutcome)`.
pub struct MigrationPipeline<'a> {
    store: &'a CanonicalStore,
    config: MigrationConfig,
    cancel: CancellationToken,
}

/// Mutable state of one run.
struct Run {
    journal: RollbackJournal,
    report: MigrationReport,
    /// Email key → user id.
    users: HashMap<String, i64>,
    /// Legacy ids left out on purpose; their dependents are skipped too.
    skipped_nodes: HashSet<i64>,
    skipped_devices: HashSet<i64>,
    skipped_interfaces: HashSet<i64>,
}

impl Run {
    fn new() -> Self {
        Self {
            journal: RollbackJournal::new(),
            report: MigrationReport::default(),
            users: HashMap::new(),
            skipped_nodes: HashSet::new(),
            skipped_devices: HashSet::new(),
            skipped_interfaces: HashSet::new(),
        }
    }

    /// Run `body` with fresh reports for `phases`. The reports join the run
    /// report even when `body` stops part way with an error.
    fn in_phases<const N: usize>(
        &mut self,
        phases: [Phase; N],
        body: impl FnOnce(&mut Run, &mut [PhaseReport; N]) -> Result<()>,
    ) -> Result<()> {
        let mut reports = phases.map(PhaseReport::new);
        let result = body(self, &mut reports);
        for report in reports {
            self.report.push(report);
        }
        result
    }
}

/// Whether a per-record result was saved or skipped on purpose.
enum Saved {
    Yes,
    Skipped,
}

impl<'a> MigrationPipeline<'a> {
    pub fn new(store: &'a CanonicalStore, config: MigrationConfig) -> Self {
        Self {
            store,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` to interrupt the run.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the whole migration.
    pub fn run(
        &self,
        source: &dyn LegacySource,
        decisions: &mut dyn DecisionProvider,
    ) -> Result<MigrationOutcome> {
        let mapper = StatusMapper::validate(
            self.config.status_mapping.as_ref(),
            &self.store.statuses()?,
        )?;
        let zones = self.store.zones()?;
        if let Some(default_zone) = self.config.default_zone {
            if !zones.iter().any(|z| z.id == default_zone) {
                return Err(MeshError::config(format!(
                    "Default zone {} does not exist",
                    default_zone
                )));
            }
        }
        let resolver = SpatialLayerResolver::new(zones, self.config.default_zone);

        info!("Starting migration");
        let mut run = Run::new();
        let result = self
            .run_phases(source, decisions, &mapper, &resolver, &mut run)
            .and_then(|()| self.cancel.check())
            .and_then(|()| self.confirm(&run.report, decisions));

        let Run {
            journal, report, ..
        } = run;

        let reason = match result {
            Ok(true) => {
                info!("Migration kept: {} entities saved", journal.len());
                return Ok(MigrationOutcome {
                    report,
                    disposition: RunDisposition::Kept,
                });
            }
            Ok(false) => RollbackReason::Rejected,
            Err(MeshError::Cancelled) => RollbackReason::Cancelled,
            Err(e) => {
                error!("Migration aborted: {}", e);
                RollbackReason::Fatal(e.to_string())
            }
        };

        warn!("Rolling back migration ({:?})", reason);
        let rollback = RollbackManager::rollback(self.store, journal);
        Ok(MigrationOutcome {
            report,
            disposition: RunDisposition::RolledBack {
                reason,
                report: rollback,
            },
        })
    }

    fn run_phases(
        &self,
        source: &dyn LegacySource,
        decisions: &mut dyn DecisionProvider,
        mapper: &StatusMapper,
        resolver: &SpatialLayerResolver,
        run: &mut Run,
    ) -> Result<()> {
        self.cancel.check()?;
        let nodes = source.nodes()?;
        run.in_phases([Phase::Users], |run, reports| {
            self.migrate_users(&nodes.records, run, &mut reports[0])
        })?;

        self.cancel.check()?;
        run.in_phases([Phase::Nodes], |run, reports| {
            self.migrate_nodes(&nodes, mapper, resolver, decisions, run, &mut reports[0])
        })?;

        self.cancel.check()?;
        let devices = source.devices()?;
        run.in_phases([Phase::Devices], |run, reports| {
            self.migrate_devices(&devices, run, &mut reports[0])
        })?;

        self.cancel.check()?;
        let interfaces = source.interfaces()?;
        run.in_phases(
            [Phase::Interfaces, Phase::Vaps, Phase::Ipv4, Phase::Ipv6],
            |run, reports| self.migrate_interfaces(&interfaces, run, reports),
        )?;

        self.cancel.check()?;
        let links = source.links()?;
        run.in_phases([Phase::Links], |run, reports| {
            self.migrate_links(&links, run, &mut reports[0])
        })?;

        self.cancel.check()?;
        let contacts = source.contacts()?;
        run.in_phases([Phase::Contacts], |run, reports| {
            self.migrate_contacts(&contacts, run, &mut reports[0])
        })?;

        Ok(())
    }

    /// Ask until the operator says yes or no. Blank means yes.
    fn confirm(
        &self,
        report: &MigrationReport,
        decisions: &mut dyn DecisionProvider,
    ) -> Result<bool> {
        let question = Question::ConfirmRun {
            summary: report.to_string(),
        };
        loop {
            let answer = decisions
                .ask(&question)
                .ok_or_else(|| MeshError::InputClosed {
                    question: question.subject(),
                })?;
            match answer.trim().to_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                other => warn!("Please answer y or n, not '{}'", other),
            }
        }
    }

    fn migrate_users(
        &self,
        nodes: &[LegacyNode],
        run: &mut Run,
        phase: &mut PhaseReport,
    ) -> Result<()> {
        for candidate in UserResolver::extract(nodes) {
            let key = candidate.email.clone();
            let result = (|| -> Result<i64> {
                if !is_email(&candidate.email) {
                    return Err(MeshError::validation("email", "not a valid address"));
                }
                let username = UserResolver::unique_username(&candidate.base_username, |c| {
                    self.store.username_exists(c)
                })?;
                let credential = UserResolver::generate_credential();
                let id = self.store.insert_user(&NewUser {
                    username: username.clone(),
                    first_name: candidate.first_name.clone(),
                    last_name: candidate.last_name.clone(),
                    email: candidate.email.clone(),
                    credential_hash: credential.hash,
                })?;
                debug!(user_id = id, username = %username, "User created");
                Ok(id)
            })();

            match result {
                Ok(id) => {
                    run.journal.record(EntityKind::User, id);
                    run.users.insert(UserResolver::email_key(&candidate.email), id);
                    phase.record_saved();
                }
                Err(e) => record_or_escalate(phase, key, e)?,
            }
        }
        Ok(())
    }

    fn migrate_nodes(
        &self,
        nodes: &LegacyBatch<LegacyNode>,
        mapper: &StatusMapper,
        resolver: &SpatialLayerResolver,
        decisions: &mut dyn DecisionProvider,
        run: &mut Run,
        phase: &mut PhaseReport,
    ) -> Result<()> {
        record_rejected(phase, "node", &nodes.rejected);

        for node in &nodes.records {
            let key = format!("node #{}", node.id);
            match self.migrate_node(node, mapper, resolver, decisions, run) {
                Ok(Saved::Yes) => {
                    run.journal.record(EntityKind::Node, node.id);
                    phase.record_saved();
                }
                Ok(Saved::Skipped) => {
                    run.skipped_nodes.insert(node.id);
                    phase.record_skipped();
                }
                Err(e) => record_or_escalate(phase, key, e)?,
            }
        }
        Ok(())
    }

    fn migrate_node(
        &self,
        node: &LegacyNode,
        mapper: &StatusMapper,
        resolver: &SpatialLayerResolver,
        decisions: &mut dyn DecisionProvider,
        run: &Run,
    ) -> Result<Saved> {
        if node.is_unconfirmed() {
            debug!(node_id = node.id, "Skipping unconfirmed node");
            return Ok(Saved::Skipped);
        }

        let user_id = *run
            .users
            .get(&UserResolver::email_key(&node.email))
            .ok_or_else(|| MeshError::validation("email", "owner was not migrated"))?;

        if node.name.trim().is_empty() {
            return Err(MeshError::validation("name", "must not be blank"));
        }
        if node.slug.trim().is_empty() {
            return Err(MeshError::validation("slug", "must not be blank"));
        }
        let point = GeoPoint::new(node.lng, node.lat);
        if !point.is_valid() {
            return Err(MeshError::validation(
                "coordinates",
                format!("({}, {}) is not a valid position", node.lng, node.lat),
            ));
        }

        let zone_id = match resolver.resolve(node.id, &node.name, &point, decisions)? {
            ZoneAssignment::Zone(id) => id,
            ZoneAssignment::Discarded => {
                info!(node_id = node.id, "Node discarded, no zone assigned");
                return Ok(Saved::Skipped);
            }
        };

        let mut data = AttributeMap::new();
        if node.is_hotspot() {
            data.insert("is_hotspot".to_string(), "true".to_string());
        }
        if let Some(postal_code) = node.postal_code.as_deref().filter(|p| !p.trim().is_empty()) {
            data.insert("postal_code".to_string(), postal_code.trim().to_string());
        }

        self.store.insert_node(&NodeEntity {
            id: node.id,
            user_id,
            zone_id,
            status_id: mapper.resolve(&node.status),
            name: node.name.trim().to_string(),
            slug: node.slug.trim().to_string(),
            geometry: point,
            elevation: node.alt,
            address: None,
            description: node.description.clone(),
            notes: node.notes.clone(),
            added: node.added,
            updated: node.updated,
            data,
        })?;
        debug!(node_id = node.id, zone_id, "Node saved");
        Ok(Saved::Yes)
    }

    fn migrate_devices(
        &self,
        devices: &LegacyBatch<LegacyDevice>,
        run: &mut Run,
        phase: &mut PhaseReport,
    ) -> Result<()> {
        record_rejected(phase, "device", &devices.rejected);

        for device in &devices.records {
            let key = format!("device #{}", device.id);
            if run.skipped_nodes.contains(&device.node_id) {
                run.skipped_devices.insert(device.id);
                phase.record_skipped();
                continue;
            }
            match self.migrate_device(device, &mut run.journal) {
                Ok(()) => phase.record_saved(),
                Err(e) => record_or_escalate(phase, key, e)?,
            }
        }
        Ok(())
    }

    fn migrate_device(&self, device: &LegacyDevice, journal: &mut RollbackJournal) -> Result<()> {
        if !self
            .store
            .exists(EntityRef::new(EntityKind::Node, device.node_id))?
        {
            return Err(MeshError::NotFound {
                kind: EntityKind::Node.to_string(),
                id: device.node_id,
            });
        }
        if device.name.trim().is_empty() {
            return Err(MeshError::validation("name", "must not be blank"));
        }

        let mut data = AttributeMap::new();
        insert_if_present(&mut data, "model", &device.model);
        insert_if_present(&mut data, "cname", &device.cname);

        self.store.insert_device(&DeviceEntity {
            id: device.id,
            node_id: device.node_id,
            kind: MigrationDefaults::DEVICE_TYPE.to_string(),
            name: device.name.trim().to_string(),
            description: device.description.clone(),
            added: device.added,
            updated: device.updated,
            data,
        })?;
        journal.record(EntityKind::Device, device.id);

        let protocol = device.routing_protocol.trim();
        if !protocol.is_empty() {
            if let Err(e) = self.attach_routing_protocol(device.id, protocol, journal) {
                warn!(
                    device_id = device.id,
                    "Routing protocol '{}' not attached: {}", protocol, e
                );
            }
        }

        debug!(device_id = device.id, "Device saved");
        Ok(())
    }

    fn attach_routing_protocol(
        &self,
        device_id: i64,
        name: &str,
        journal: &mut RollbackJournal,
    ) -> Result<()> {
        let protocol_id = match self.store.find_routing_protocol(name)? {
            Some(existing) => existing.id,
            None => {
                let id = self.store.create_routing_protocol(name)?;
                journal.record(EntityKind::RoutingProtocol, id);
                info!("Created routing protocol '{}'", name);
                id
            }
        };
        self.store.attach_routing_protocol(device_id, protocol_id)
    }

    /// Interfaces, then their wireless associations and addresses, each
    /// counted in its own report.
    fn migrate_interfaces(
        &self,
        interfaces: &LegacyBatch<LegacyInterface>,
        run: &mut Run,
        reports: &mut [PhaseReport; 4],
    ) -> Result<()> {
        let [phase, vaps, ipv4, ipv6] = reports;
        record_rejected(phase, "interface", &interfaces.rejected);

        for interface in &interfaces.records {
            let key = format!("interface #{}", interface.id);
            if run.skipped_devices.contains(&interface.device_id) {
                run.skipped_interfaces.insert(interface.id);
                phase.record_skipped();
                continue;
            }

            let kind = match self.migrate_interface(interface) {
                Ok(kind) => {
                    run.journal.record(EntityKind::Interface, interface.id);
                    phase.record_saved();
                    kind
                }
                Err(e) => {
                    record_or_escalate(phase, key, e)?;
                    continue;
                }
            };

            if kind == InterfaceType::Wireless {
                let essid = non_blank(interface.essid.as_deref());
                let bssid = non_blank(interface.bssid.as_deref());
                if essid.is_some() || bssid.is_some() {
                    let vap = VapEntity {
                        interface_id: interface.id,
                        essid: essid.map(str::to_string),
                        bssid: bssid.map(str::to_string),
                    };
                    match self.store.insert_vap(&vap) {
                        Ok(id) => {
                            run.journal.record(EntityKind::Vap, id);
                            vaps.record_saved();
                        }
                        Err(e) => record_or_escalate(vaps, key.clone(), e)?,
                    }
                }
            }

            for (address, report, want_v4) in [
                (interface.ipv4_address.as_deref(), &mut *ipv4, true),
                (interface.ipv6_address.as_deref(), &mut *ipv6, false),
            ] {
                let Some(address) = non_blank(address) else {
                    continue;
                };
                match self.migrate_ip(interface.id, address, want_v4) {
                    Ok(id) => {
                        run.journal.record(EntityKind::Ip, id);
                        report.record_saved();
                    }
                    Err(e) => record_or_escalate(report, key.clone(), e)?,
                }
            }
        }

        Ok(())
    }

    fn migrate_interface(&self, interface: &LegacyInterface) -> Result<InterfaceType> {
        if !self
            .store
            .exists(EntityRef::new(EntityKind::Device, interface.device_id))?
        {
            return Err(MeshError::NotFound {
                kind: EntityKind::Device.to_string(),
                id: interface.device_id,
            });
        }

        let mac = interface.mac_address.trim();
        if !MAC_ADDRESS.is_match(mac) {
            return Err(MeshError::validation(
                "mac_address",
                format!("'{}' is not a MAC address", mac),
            ));
        }

        let mut entity = InterfaceEntity {
            id: interface.id,
            device_id: interface.device_id,
            kind: InterfaceType::Virtual,
            mac: mac.to_uppercase().replace('-', ":"),
            name: interface
                .cname
                .trim()
                .chars()
                .take(MigrationDefaults::INTERFACE_NAME_MAX_CHARS)
                .collect(),
            standard: None,
            duplex: None,
            mode: None,
            channel: None,
            added: interface.added,
            updated: interface.updated,
            data: AttributeMap::new(),
        };

        match interface.kind.trim() {
            "eth" => {
                entity.kind = InterfaceType::Ethernet;
                entity.standard = Some("fast".to_string());
                entity.duplex = Some("full".to_string());
            }
            "wifi" => {
                entity.kind = InterfaceType::Wireless;
                entity.mode = non_blank(interface.wireless_mode.as_deref()).map(str::to_string);
                entity.channel =
                    non_blank(interface.wireless_channel.as_deref()).map(str::to_string);
                if let Some(essid) = non_blank(interface.essid.as_deref()) {
                    entity.data.insert("essid".to_string(), essid.to_string());
                }
                if let Some(bssid) = non_blank(interface.bssid.as_deref()) {
                    entity.data.insert("bssid".to_string(), bssid.to_string());
                }
            }
            "bridge" => entity.kind = InterfaceType::Bridge,
            "vpn" => entity.kind = InterfaceType::Tunnel,
            other => {
                entity.data.insert("old_type".to_string(), other.to_string());
            }
        }

        self.store.insert_interface(&entity)?;
        debug!(interface_id = interface.id, kind = %entity.kind, "Interface saved");
        Ok(entity.kind)
    }

    fn migrate_ip(&self, interface_id: i64, raw: &str, want_v4: bool) -> Result<i64> {
        let field = if want_v4 { "ipv4_address" } else { "ipv6_address" };
        let address: IpAddr = raw
            .parse()
            .map_err(|_| MeshError::validation(field, format!("'{}' is not an IP address", raw)))?;
        if address.is_ipv4() != want_v4 {
            return Err(MeshError::validation(
                field,
                format!("'{}' has the wrong address family", raw),
            ));
        }
        self.store.insert_ip(&IpEntity {
            interface_id,
            address,
        })
    }

    fn migrate_links(
        &self,
        links: &LegacyBatch<LegacyLink>,
        run: &mut Run,
        phase: &mut PhaseReport,
    ) -> Result<()> {
        record_rejected(phase, "link", &links.rejected);

        for link in &links.records {
            let key = format!("link #{}", link.id);
            if run.skipped_interfaces.contains(&link.from_interface_id)
                || run.skipped_interfaces.contains(&link.to_interface_id)
            {
                phase.record_skipped();
                continue;
            }
            match self.migrate_link(link) {
                Ok(()) => {
                    run.journal.record(EntityKind::Link, link.id);
                    phase.record_saved();
                }
                Err(e) => record_or_escalate(phase, key, e)?,
            }
        }
        Ok(())
    }

    fn migrate_link(&self, link: &LegacyLink) -> Result<()> {
        if link.from_interface_id == link.to_interface_id {
            return Err(MeshError::validation(
                "interfaces",
                "a link needs two different interfaces",
            ));
        }

        let mut endpoints = Vec::with_capacity(2);
        for id in [link.from_interface_id, link.to_interface_id] {
            let interface = self.store.interface(id)?.ok_or(MeshError::NotFound {
                kind: EntityKind::Interface.to_string(),
                id,
            })?;
            endpoints.push(interface);
        }

        for interface in &endpoints {
            if interface.kind != InterfaceType::Wireless {
                self.store
                    .set_interface_type(interface.id, InterfaceType::Wireless)?;
                info!(
                    interface_id = interface.id,
                    "Interface retyped from {} to wireless", interface.kind
                );
            }
        }

        let rates = [link.sync_tx, link.sync_rx];
        self.store.insert_link(&LinkEntity {
            id: link.id,
            interface_a: link.from_interface_id,
            interface_b: link.to_interface_id,
            status: "active".to_string(),
            kind: "radio".to_string(),
            metric_type: "etx".to_string(),
            metric_value: link.etx,
            dbm: link.dbm,
            min_rate: rates.into_iter().flatten().min(),
            max_rate: rates.into_iter().flatten().max(),
            access_level: link
                .hide
                .then_some(MigrationDefaults::HIDDEN_LINK_ACCESS_LEVEL),
        })?;
        debug!(link_id = link.id, "Link saved");
        Ok(())
    }

    fn migrate_contacts(
        &self,
        contacts: &LegacyBatch<LegacyContact>,
        run: &mut Run,
        phase: &mut PhaseReport,
    ) -> Result<()> {
        record_rejected(phase, "contact", &contacts.rejected);

        for contact in &contacts.records {
            let key = format!("contact #{}", contact.id);
            if run.skipped_nodes.contains(&contact.node_id) {
                phase.record_skipped();
                continue;
            }
            match self.migrate_contact(contact) {
                Ok(id) => {
                    run.journal.record(EntityKind::Contact, id);
                    phase.record_saved();
                }
                Err(e) => record_or_escalate(phase, key, e)?,
            }
        }
        Ok(())
    }

    fn migrate_contact(&self, contact: &LegacyContact) -> Result<i64> {
        let target = EntityRef::new(EntityKind::Node, contact.node_id);
        if !self.store.exists(target)? {
            return Err(MeshError::NotFound {
                kind: EntityKind::Node.to_string(),
                id: contact.node_id,
            });
        }
        if !is_email(&contact.from_email) {
            return Err(MeshError::validation("from_email", "not a valid address"));
        }
        if contact.message.trim().is_empty() {
            return Err(MeshError::validation("message", "must not be blank"));
        }

        self.store.insert_contact(&ContactEntry {
            target,
            status: ContactStatus::Sent,
            from_name: contact.from_name.trim().to_string(),
            from_email: contact.from_email.trim().to_string(),
            message: contact.message.clone(),
            ip: contact.ip.clone(),
            user_agent: contact.user_agent.clone(),
            accept_language: contact.accept_language.clone(),
            added: contact.date,
            updated: contact.date,
        })
    }
}

/// Record a per-record error in `phase`, or return it if it is fatal.
fn record_or_escalate(phase: &mut PhaseReport, key: String, error: MeshError) -> Result<()> {
    if error.is_record_level() {
        phase.record_failure(key, error);
        Ok(())
    } else {
        Err(error)
    }
}

/// Report rows the source could not read as failures of `phase`.
fn record_rejected(phase: &mut PhaseReport, kind: &str, rows: &[RejectedRow]) {
    for row in rows {
        phase.record_failure(row.key(kind), MeshError::validation("row", row.reason.clone()));
    }
}

fn is_email(value: &str) -> bool {
    match value.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.contains('@')
        }
        None => false,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn insert_if_present(data: &mut AttributeMap, key: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        data.insert(key.to_string(), value.to_string());
    }
}
