/// All collaborator record primary keys are 64-bit integers.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A chainage value: meters along the road alignment from its origin.
pub type Pk = f64;
