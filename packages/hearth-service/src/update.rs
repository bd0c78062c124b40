use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, HearthService, Result};
use hearth_domain::{Projection, merge_attributes};
use hearth_storage::queries;

/// The updatable subset of a memory. Absent fields are left untouched;
/// `attributes` is a shallow merge patch, not a replacement.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateFields {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub amount: Option<f64>,
	#[serde(with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub occurred_at: Option<OffsetDateTime>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub embedding: Option<Vec<f32>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attributes: Option<Value>,
}
impl UpdateFields {
	pub fn is_empty(&self) -> bool {
		self.content.is_none()
			&& self.amount.is_none()
			&& self.occurred_at.is_none()
			&& self.embedding.is_none()
			&& self.attributes.is_none()
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateFieldsRequest {
	pub id: Uuid,
	pub fields: UpdateFields,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateFieldsResponse {
	pub success: bool,
	pub id: Uuid,
}

impl HearthService {
	/// Applies a partial update to one memory.
	pub async fn update_fields(
		&self,
		request: UpdateFieldsRequest,
	) -> Result<UpdateFieldsResponse> {
		self.with_deadline(request.timeout_ms, self.apply_update(request.id, request.fields)).await
	}

	/// Shared core of `update_fields` and `soft_delete`: validates the patch,
	/// merges attributes under a row lock, and rewrites the projected columns
	/// so they keep mirroring the merged attributes.
	pub(crate) async fn apply_update(
		&self,
		id: Uuid,
		fields: UpdateFields,
	) -> Result<UpdateFieldsResponse> {
		if fields.is_empty() {
			return Err(Error::InvalidRequest { message: "No updates provided.".to_string() });
		}
		if let Some(content) = fields.content.as_deref()
			&& content.trim().is_empty()
		{
			return Err(Error::InvalidRequest {
				message: "content must be non-empty.".to_string(),
			});
		}
		if let Some(embedding) = fields.embedding.as_ref() {
			let expected = self.cfg.engine.vector_dim as usize;

			if embedding.len() != expected {
				return Err(Error::InvalidRequest {
					message: format!(
						"embedding must have {expected} dimensions, got {}.",
						embedding.len()
					),
				});
			}
		}
		if let Some(patch) = fields.attributes.as_ref()
			&& !patch.is_object()
		{
			return Err(Error::InvalidRequest {
				message: "attributes must be an object.".to_string(),
			});
		}

		let mut tx = self.db.pool.begin().await?;
		let Some(current) = queries::attributes_for_update(&mut tx, id).await? else {
			return Err(Error::NotFound { message: format!("Memory {id} not found.") });
		};
		let mut builder = QueryBuilder::<Postgres>::new("UPDATE memories SET ");
		let mut assignments = builder.separated(", ");

		if let Some(content) = fields.content.as_deref() {
			assignments.push("content = ");
			assignments.push_bind_unseparated(content.trim().to_string());
		}
		if let Some(amount) = fields.amount {
			assignments.push("amount = ");
			assignments.push_bind_unseparated(amount);
		}
		if let Some(occurred_at) = fields.occurred_at {
			assignments.push("occurred_at = ");
			assignments.push_bind_unseparated(occurred_at);
		}
		if let Some(embedding) = fields.embedding.as_deref() {
			assignments.push("embedding = ");
			assignments.push_bind_unseparated(crate::vector_to_pg(embedding));
			assignments.push_unseparated("::text::vector");
		}
		if let Some(patch) = fields.attributes.as_ref() {
			let merged = merge_attributes(&current, patch);
			let projection = Projection::derive(&merged);

			assignments.push("attributes = ");
			assignments.push_bind_unseparated(merged);
			assignments.push("type = ");
			assignments.push_bind_unseparated(projection.memory_type);
			assignments.push("thread_id = ");
			assignments.push_bind_unseparated(projection.thread_id);
			assignments.push("category = ");
			assignments.push_bind_unseparated(projection.category);
			assignments.push("person = ");
			assignments.push_bind_unseparated(projection.person);
			assignments.push("metric = ");
			assignments.push_bind_unseparated(projection.metric);
			assignments.push("subject = ");
			assignments.push_bind_unseparated(projection.subject);
			assignments.push("source = ");
			assignments.push_bind_unseparated(projection.source);
			assignments.push("value = ");
			assignments.push_bind_unseparated(projection.value);
			assignments.push("deleted = ");
			assignments.push_bind_unseparated(projection.deleted);
			assignments.push("external_id = ");
			assignments.push_bind_unseparated(projection.external_id);
		}

		builder.push(" WHERE memory_id = ");
		builder.push_bind(id);
		builder.build().execute(&mut *tx).await?;
		tx.commit().await?;

		Ok(UpdateFieldsResponse { success: true, id })
	}
}
