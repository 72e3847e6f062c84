use uuid::Uuid;

use crate::domain::month::MonthKey;
use crate::domain::records::RecordStatus;

/// Identifies entities that expose a stable unique identifier.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Provides access to a human-friendly entity name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Records that belong to one housing unit and one calendar month.
pub trait MonthScoped {
    fn unit_id(&self) -> Uuid;
    fn month(&self) -> MonthKey;

    fn belongs_to(&self, unit_id: Uuid, month: MonthKey) -> bool {
        self.unit_id() == unit_id && self.month() == month
    }
}

/// Records that pass through the pending/approved queue.
pub trait Approvable {
    fn status(&self) -> RecordStatus;
    fn set_status(&mut self, status: RecordStatus);

    fn is_approved(&self) -> bool {
        self.status() == RecordStatus::Approved
    }
}

// Re-export common dependencies so consumers can rely on this module as a façade.
pub use chrono;
pub use serde;
pub use uuid;
