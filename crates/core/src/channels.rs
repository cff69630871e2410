//! Well-known pub/sub channel names for association changes.
//!
//! Connected clients subscribe to these channels to learn when an event's
//! departments, incident types or incident divisions are attached or
//! detached. One notification is published per channel per mutation.

/// Departments attached to an event.
pub const ASSOCIATE_DEPARTMENTS: &str = "associate-departments-channel";

/// Departments detached from an event.
pub const DISASSOCIATE_DEPARTMENTS: &str = "disassociate-departments-channel";

/// Incident types attached to an event.
pub const ASSOCIATE_INCIDENT_TYPES: &str = "associate-incident-types-channel";

/// Incident types detached from an event.
pub const DISASSOCIATE_INCIDENT_TYPES: &str = "disassociate-incident-types-channel";

/// Incident divisions attached to an event.
pub const ASSOCIATE_INCIDENT_DIVISIONS: &str = "associate-incident-division";

/// Incident divisions detached from an event.
pub const DISASSOCIATE_INCIDENT_DIVISIONS: &str = "disassociate-incident-division";

/// Event name carried by every attach notification.
pub const EVENT_ASSOCIATED: &str = "associations.created";

/// Event name carried by every detach notification.
pub const EVENT_DISASSOCIATED: &str = "associations.removed";
