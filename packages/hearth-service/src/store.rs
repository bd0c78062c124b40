use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, HearthService, Result};
use hearth_domain::Projection;
use hearth_storage::queries::{self, NewMemory};

/// One memory to persist. Also the per-item shape of `batch_store`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreItem {
	pub owner_id: String,
	pub content: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attributes: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub amount: Option<f64>,
	#[serde(with = "crate::time_serde::option", default, skip_serializing_if = "Option::is_none")]
	pub occurred_at: Option<OffsetDateTime>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub embedding: Option<Vec<f32>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreRequest {
	#[serde(flatten)]
	pub item: StoreItem,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreResponse {
	pub success: bool,
	pub id: Uuid,
}

impl HearthService {
	/// Persists one memory and returns its id.
	pub async fn store(&self, request: StoreRequest) -> Result<StoreResponse> {
		self.with_deadline(request.timeout_ms, async {
			let memory = self.prepare_memory(&request.item, OffsetDateTime::now_utc())?;
			let id = memory.memory_id;

			queries::ensure_user(&self.db.pool, memory.owner_id).await?;
			queries::insert_memory(&self.db.pool, &memory).await?;

			Ok(StoreResponse { success: true, id })
		})
		.await
	}

	/// Validates one item and derives everything the row needs: resolved
	/// owner, projected columns, and the vector literal.
	pub(crate) fn prepare_memory(
		&self,
		item: &StoreItem,
		now: OffsetDateTime,
	) -> Result<NewMemory> {
		let content = item.content.trim();

		if content.is_empty() {
			return Err(Error::InvalidRequest { message: "content is required.".to_string() });
		}

		let attributes = item.attributes.clone().unwrap_or_else(|| json!({}));

		if !attributes.is_object() {
			return Err(Error::InvalidRequest {
				message: "attributes must be an object.".to_string(),
			});
		}
		if let Some(embedding) = item.embedding.as_ref() {
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

		let owner_id = self.resolve_owner(&item.owner_id)?;
		let projection = Projection::derive(&attributes);

		Ok(NewMemory {
			memory_id: Uuid::new_v4(),
			owner_id,
			content: content.to_string(),
			attributes,
			projection,
			embedding: item.embedding.as_deref().map(crate::vector_to_pg),
			amount: item.amount,
			occurred_at: item.occurred_at,
			created_at: now,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn store_request_flattens_item_fields() {
		let request: StoreRequest = serde_json::from_value(json!({
			"owner_id": "ada",
			"content": "Bought groceries",
			"amount": 42.5,
			"timeout_ms": 2_000,
		}))
		.expect("Expected request to deserialize.");

		assert_eq!(request.item.owner_id, "ada");
		assert_eq!(request.item.amount, Some(42.5));
		assert_eq!(request.timeout_ms, Some(2_000));
	}

	#[test]
	fn occurred_at_accepts_rfc3339() {
		let request: StoreRequest = serde_json::from_value(json!({
			"owner_id": "ada",
			"content": "Dentist",
			"occurred_at": "2026-03-01T09:00:00Z",
		}))
		.expect("Expected request to deserialize.");

		assert!(request.item.occurred_at.is_some());
	}
}
