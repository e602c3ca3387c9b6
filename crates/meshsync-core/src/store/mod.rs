//! The canonical store a migration writes into.
//!
//! Statuses and zones are owned by the store's operator and only read by a
//! migration; everything else in [`EntityKind`] is created by a run and can
//! be deleted again by its rollback.

mod entities;
mod schema;
mod sqlite;

pub use entities::{
    AttributeMap, ContactEntry, ContactStatus, DeviceEntity, EntityKind, EntityRef,
    ExternalRecordMapping, InterfaceEntity, InterfaceType, IpEntity, LinkEntity, NewUser,
    NodeEntity, RoutingProtocol, Status, UserIdentity, VapEntity, Zone,
};
pub use sqlite::CanonicalStore;
