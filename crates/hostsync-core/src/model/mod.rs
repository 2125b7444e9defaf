// ── Domain model ──

pub mod inventory;
pub mod profile;
pub mod record;

pub use inventory::{InventoryEvent, InventoryRecord};
pub use profile::{MonitoringProfile, OsFamily, RejectReason, Verdict};
pub use record::{MonitoringRecord, RefSet};
