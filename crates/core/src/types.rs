/// Opaque job identifier assigned by the execution engine.
pub type JobId = String;

/// Opaque batch identifier assigned by the batch service.
pub type BatchId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
