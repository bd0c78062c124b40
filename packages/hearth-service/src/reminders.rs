use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, HearthService, Result};
use hearth_storage::queries::{self, NewReminder};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleReminderRequest {
	pub memory_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub fire_at: OffsetDateTime,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub idempotency_key: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleReminderResponse {
	pub success: bool,
	pub reminder_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetPendingRemindersRequest {
	pub owner_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}

/// A due reminder joined with the memory it points at, so the caller can
/// deliver it without a second lookup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingReminder {
	pub reminder_id: Uuid,
	pub memory_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub fire_at: OffsetDateTime,
	pub content: String,
	pub attributes: Value,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payload: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetPendingRemindersResponse {
	pub reminders: Vec<PendingReminder>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarkReminderSentRequest {
	pub reminder_id: Uuid,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarkReminderSentResponse {
	pub success: bool,
}

impl HearthService {
	/// Schedules a reminder for an existing memory. Retrying a call that
	/// carried an idempotency key returns the reminder already scheduled
	/// under that key instead of creating a second one.
	pub async fn schedule_reminder(
		&self,
		request: ScheduleReminderRequest,
	) -> Result<ScheduleReminderResponse> {
		self.with_deadline(request.timeout_ms, async {
			if request.fire_at <= OffsetDateTime::now_utc() {
				return Err(Error::InvalidRequest {
					message: "fire_at must be in the future.".to_string(),
				});
			}
			if queries::memory_owner(&self.db.pool, request.memory_id).await?.is_none() {
				return Err(Error::NotFound {
					message: format!("Memory {} not found.", request.memory_id),
				});
			}

			let idempotency_key = request
				.idempotency_key
				.as_deref()
				.map(str::trim)
				.filter(|key| !key.is_empty())
				.map(str::to_string);
			let reminder = NewReminder {
				reminder_id: Uuid::new_v4(),
				memory_id: request.memory_id,
				fire_at: request.fire_at,
				payload: request.payload.clone(),
				idempotency_key,
			};

			if queries::insert_reminder(&self.db.pool, &reminder).await? {
				return Ok(ScheduleReminderResponse {
					success: true,
					reminder_id: reminder.reminder_id,
				});
			}

			// The insert was skipped, so this key is already scheduled.
			let existing = match reminder.idempotency_key.as_deref() {
				Some(key) => queries::reminder_for_key(&self.db.pool, key).await?,
				None => None,
			};
			let Some(reminder_id) = existing else {
				return Err(Error::Storage {
					message: "Reminder insert affected no rows.".to_string(),
				});
			};

			Ok(ScheduleReminderResponse { success: true, reminder_id })
		})
		.await
	}

	/// Returns every unsent reminder for the owner whose `fire_at` has
	/// passed, oldest first.
	pub async fn get_pending_reminders(
		&self,
		request: GetPendingRemindersRequest,
	) -> Result<GetPendingRemindersResponse> {
		self.with_deadline(request.timeout_ms, async {
			let owner_id = self.resolve_owner(&request.owner_id)?;
			let rows =
				queries::pending_reminders(&self.db.pool, owner_id, OffsetDateTime::now_utc())
					.await?;
			let reminders = rows
				.into_iter()
				.map(|row| PendingReminder {
					reminder_id: row.reminder_id,
					memory_id: row.memory_id,
					fire_at: row.fire_at,
					content: row.content,
					attributes: row.attributes,
					payload: row.payload,
				})
				.collect();

			Ok(GetPendingRemindersResponse { reminders })
		})
		.await
	}

	/// Stamps a reminder delivered so it stops showing up as pending.
	/// Stamping an already-sent reminder is a no-op.
	pub async fn mark_reminder_sent(
		&self,
		request: MarkReminderSentRequest,
	) -> Result<MarkReminderSentResponse> {
		self.with_deadline(request.timeout_ms, async {
			let updated = queries::mark_reminder_sent(
				&self.db.pool,
				request.reminder_id,
				OffsetDateTime::now_utc(),
			)
			.await?;

			if !updated && !queries::reminder_exists(&self.db.pool, request.reminder_id).await? {
				return Err(Error::NotFound {
					message: format!("Reminder {} not found.", request.reminder_id),
				});
			}

			Ok(MarkReminderSentResponse { success: true })
		})
		.await
	}
}
