use serde_json::Value;
use sqlx::{Executor, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::PendingReminderRow};
use hearth_domain::Projection;

/// A fully prepared memory row, ready to insert.
///
/// `embedding` is the pgvector text rendering, `projection` the column values
/// derived from `attributes`.
pub struct NewMemory {
	pub memory_id: Uuid,
	pub owner_id: Uuid,
	pub content: String,
	pub attributes: Value,
	pub projection: Projection,
	pub embedding: Option<String>,
	pub amount: Option<f64>,
	pub occurred_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
}

pub async fn ensure_user<'e, E>(executor: E, user_id: Uuid) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
		.bind(user_id)
		.execute(executor)
		.await?;

	Ok(())
}

pub async fn insert_memory<'e, E>(executor: E, memory: &NewMemory) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query(
		"\
INSERT INTO memories (
	memory_id,
	owner_id,
	content,
	attributes,
	type,
	thread_id,
	category,
	person,
	metric,
	subject,
	source,
	value,
	deleted,
	external_id,
	embedding,
	amount,
	occurred_at,
	created_at
)
VALUES (
	$1,
	$2,
	$3,
	$4,
	$5,
	$6,
	$7,
	$8,
	$9,
	$10,
	$11,
	$12,
	$13,
	$14,
	$15::text::vector,
	$16,
	$17,
	$18
)",
	)
	.bind(memory.memory_id)
	.bind(memory.owner_id)
	.bind(memory.content.as_str())
	.bind(&memory.attributes)
	.bind(memory.projection.memory_type.as_deref())
	.bind(memory.projection.thread_id.as_deref())
	.bind(memory.projection.category.as_deref())
	.bind(memory.projection.person.as_deref())
	.bind(memory.projection.metric.as_deref())
	.bind(memory.projection.subject.as_deref())
	.bind(memory.projection.source.as_deref())
	.bind(memory.projection.value.as_deref())
	.bind(memory.projection.deleted)
	.bind(memory.projection.external_id.as_deref())
	.bind(memory.embedding.as_deref())
	.bind(memory.amount)
	.bind(memory.occurred_at)
	.bind(memory.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn memory_owner<'e, E>(executor: E, memory_id: Uuid) -> Result<Option<Uuid>>
where
	E: Executor<'e, Database = Postgres>,
{
	let owner = sqlx::query_scalar("SELECT owner_id FROM memories WHERE memory_id = $1")
		.bind(memory_id)
		.fetch_optional(executor)
		.await?;

	Ok(owner)
}

/// Reads a memory's attribute document and locks the row for the rest of the
/// transaction.
pub async fn attributes_for_update(
	tx: &mut Transaction<'_, Postgres>,
	memory_id: Uuid,
) -> Result<Option<Value>> {
	let attributes =
		sqlx::query_scalar("SELECT attributes FROM memories WHERE memory_id = $1 FOR UPDATE")
			.bind(memory_id)
			.fetch_optional(&mut **tx)
			.await?;

	Ok(attributes)
}

/// A reminder to insert. `idempotency_key`, when present, deduplicates
/// retries of the same schedule call.
pub struct NewReminder {
	pub reminder_id: Uuid,
	pub memory_id: Uuid,
	pub fire_at: OffsetDateTime,
	pub payload: Option<Value>,
	pub idempotency_key: Option<String>,
}

/// Inserts a reminder. Returns `false` when an idempotency-key collision
/// turned the insert into a no-op.
pub async fn insert_reminder<'e, E>(executor: E, reminder: &NewReminder) -> Result<bool>
where
	E: Executor<'e, Database = Postgres>,
{
	let done = sqlx::query(
		"\
INSERT INTO reminders (reminder_id, memory_id, fire_at, payload, idempotency_key)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (idempotency_key) WHERE idempotency_key IS NOT NULL DO NOTHING",
	)
	.bind(reminder.reminder_id)
	.bind(reminder.memory_id)
	.bind(reminder.fire_at)
	.bind(reminder.payload.as_ref())
	.bind(reminder.idempotency_key.as_deref())
	.execute(executor)
	.await?;

	Ok(done.rows_affected() == 1)
}

pub async fn reminder_for_key<'e, E>(executor: E, idempotency_key: &str) -> Result<Option<Uuid>>
where
	E: Executor<'e, Database = Postgres>,
{
	let reminder_id =
		sqlx::query_scalar("SELECT reminder_id FROM reminders WHERE idempotency_key = $1")
			.bind(idempotency_key)
			.fetch_optional(executor)
			.await?;

	Ok(reminder_id)
}

/// Unsent reminders due at or before `due_at`, joined with their memory,
/// oldest first.
pub async fn pending_reminders<'e, E>(
	executor: E,
	owner_id: Uuid,
	due_at: OffsetDateTime,
) -> Result<Vec<PendingReminderRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let rows = sqlx::query_as(
		"\
SELECT r.reminder_id, r.memory_id, r.fire_at, r.payload, m.content, m.attributes
FROM reminders AS r
JOIN memories AS m ON m.memory_id = r.memory_id
WHERE m.owner_id = $1 AND r.sent_at IS NULL AND r.fire_at <= $2
ORDER BY r.fire_at",
	)
	.bind(owner_id)
	.bind(due_at)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// Stamps a reminder sent. Returns `false` when it was already sent.
pub async fn mark_reminder_sent<'e, E>(
	executor: E,
	reminder_id: Uuid,
	sent_at: OffsetDateTime,
) -> Result<bool>
where
	E: Executor<'e, Database = Postgres>,
{
	let done =
		sqlx::query("UPDATE reminders SET sent_at = $1 WHERE reminder_id = $2 AND sent_at IS NULL")
			.bind(sent_at)
			.bind(reminder_id)
			.execute(executor)
			.await?;

	Ok(done.rows_affected() == 1)
}

pub async fn reminder_exists<'e, E>(executor: E, reminder_id: Uuid) -> Result<bool>
where
	E: Executor<'e, Database = Postgres>,
{
	let exists =
		sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reminders WHERE reminder_id = $1)")
			.bind(reminder_id)
			.fetch_one(executor)
			.await?;

	Ok(exists)
}
