use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// A memory row plus the ranking score of the query that produced it.
///
/// `similarity` is `NULL` for chronological results.
#[derive(Debug, sqlx::FromRow)]
pub struct ScoredMemoryRow {
	pub memory_id: Uuid,
	pub owner_id: Uuid,
	pub content: String,
	pub attributes: Value,
	pub amount: Option<f64>,
	pub occurred_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub similarity: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct PendingReminderRow {
	pub reminder_id: Uuid,
	pub memory_id: Uuid,
	pub fire_at: OffsetDateTime,
	pub payload: Option<Value>,
	pub content: String,
	pub attributes: Value,
}
