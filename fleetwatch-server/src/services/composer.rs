use chrono::DateTime;

use crate::models::{Channel, Incident, NewOutboxEntry, VenueContact};

/// Longest body that fits a single standard SMS message.
const SMS_MAX_LENGTH: usize = 160;

/// Builds outbox entries for an incident and its venue contacts. Pure:
/// takes data in, returns rows to enqueue, touches nothing.
pub struct NotificationComposer;

impl NotificationComposer {
    /// One entry per (contact, channel) pair that has an address for the
    /// channel. A contact subscribed to EMAIL without an email address is
    /// skipped rather than treated as an error.
    pub fn compose(&self, incident: &Incident, contacts: &[VenueContact]) -> Vec<NewOutboxEntry> {
        let mut entries = Vec::new();

        for contact in contacts {
            for channel in &contact.channels {
                match channel {
                    Channel::Email => {
                        if let Some(email) = &contact.email {
                            entries.push(NewOutboxEntry {
                                incident_id: incident.id.clone(),
                                venue_id: incident.venue_id.clone(),
                                channel: Channel::Email,
                                to_address: email.clone(),
                                subject: Some(self.build_email_subject(incident)),
                                body: self.build_email_body(incident, contact),
                                scheduled_at: incident.detected_at,
                            });
                        }
                    }
                    Channel::Sms => {
                        if let Some(phone) = &contact.phone {
                            entries.push(NewOutboxEntry {
                                incident_id: incident.id.clone(),
                                venue_id: incident.venue_id.clone(),
                                channel: Channel::Sms,
                                to_address: phone.clone(),
                                subject: None,
                                body: self.build_sms_body(incident),
                                scheduled_at: incident.detected_at,
                            });
                        }
                    }
                }
            }
        }

        entries
    }

    fn build_email_subject(&self, incident: &Incident) -> String {
        format!(
            "[FleetWatch Alert] {} - {} - Venue {}",
            incident.incident_type.label(),
            incident.severity,
            incident.venue_id
        )
    }

    fn build_email_body(&self, incident: &Incident, contact: &VenueContact) -> String {
        let detected = DateTime::from_timestamp(incident.detected_at, 0)
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| incident.detected_at.to_string());

        let first_action = incident
            .troubleshooting_steps
            .0
            .first()
            .map(|step| format!("\nFirst step: {} - {}", step.title, step.description))
            .unwrap_or_default();

        [
            format!("Hi {},", contact.name),
            String::new(),
            format!("An incident was detected at venue {}.", incident.venue_id),
            String::new(),
            format!("Type:      {}", incident.incident_type.label()),
            format!("Severity:  {}", incident.severity),
            format!("Device:    {}", incident.device_id),
            format!("Details:   {}", incident.summary),
            format!("Detected:  {detected}"),
            first_action,
            String::new(),
            String::from("View all steps in the FleetWatch dashboard."),
            String::new(),
            format!("Incident ID: {}", incident.id),
        ]
        .join("\n")
    }

    fn build_sms_body(&self, incident: &Incident) -> String {
        let raw = format!(
            "FleetWatch Alert: {} ({}) on device {} at venue {}. Check dashboard.",
            incident.incident_type.label(),
            incident.severity,
            incident.device_id,
            incident.venue_id
        );

        if raw.len() > SMS_MAX_LENGTH {
            let mut cut = SMS_MAX_LENGTH - 3;
            while !raw.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &raw[..cut])
        } else {
            raw
        }
    }
}
