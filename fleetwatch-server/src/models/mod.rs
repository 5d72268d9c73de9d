pub mod device;
pub mod enums;
pub mod incident;
pub mod outbox;
pub mod venue_contact;

pub use device::{Device, DeviceListItem, DeviceTable, Telemetry};
pub use enums::{
    Channel, DeliveryStatus, DeviceStatus, IncidentStatus, IncidentType, Severity,
};
pub use incident::{Incident, IncidentTable, TroubleshootingStep};
pub use outbox::{DeliverySummary, NewOutboxEntry, OutboxEntry, OutboxTable};
pub use venue_contact::{VenueContact, VenueContactTable};

use serde::Serialize;

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;

    /// The dependencies of the table
    fn dependencies(&self) -> Vec<&'static str>;
}

/// Common envelope for every paginated list endpoint. Consumers can tell
/// they reached the end when `items.len() < limit`.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
