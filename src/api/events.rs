use crate::api::models::Contact;

/// A change to mirror to the remote service, in mutation order.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Added(Contact),
    Deleted { id: String },
    Updated(Contact),
}

impl SyncEvent {
    pub fn contact_id(&self) -> &str {
        match self {
            SyncEvent::Added(c) | SyncEvent::Updated(c) => &c.id,
            SyncEvent::Deleted { id } => id,
        }
    }
}
