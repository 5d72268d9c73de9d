mod device;
mod incident;
mod outbox;
mod venue_contact;

pub use device::DeviceRepository;
pub use incident::IncidentRepository;
pub use outbox::{MAX_DELIVERY_ATTEMPTS, OutboxRepository};
pub use venue_contact::VenueContactRepository;
