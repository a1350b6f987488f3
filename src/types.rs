//! Shared type aliases for the assessment engine.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Globally unique identifier for one attempt.
pub type AttemptId = Uuid;

/// Identity of the test-taker driving an attempt.
pub type SubjectId = String;

/// Storage path under which an attempt's snapshots are keyed.
pub type ContentPath = String;

/// Identifier of an item within its owning section.
pub type ItemIdent = String;

/// Wall-clock instant used for open/close windows.
pub type Timestamp = DateTime<Utc>;

/// Current wall-clock time.
///
/// All timing rules in the engine are business rules over wall-clock
/// timestamps, so every component reads the clock through this one helper.
pub fn now() -> Timestamp {
    Utc::now()
}
