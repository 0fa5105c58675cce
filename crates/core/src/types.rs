/// Internal database identifier type.
pub type DbId = i64;

/// UTC timestamp type used across models.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
