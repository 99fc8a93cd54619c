/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// CRM sub-tenant (location) identifier, as issued by the source platform.
pub type AccountId = String;

/// CRM user identifier within an account.
pub type UserId = String;
