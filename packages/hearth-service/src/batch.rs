use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, HearthService, Result,
	search::{SearchRequest, SearchResponse},
	store::StoreItem,
};
use hearth_storage::queries;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchStoreRequest {
	pub items: Vec<StoreItem>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchStoreResponse {
	pub success: bool,
	pub ids: Vec<Uuid>,
	pub count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchSearchRequest {
	pub queries: Vec<SearchRequest>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}

/// One slot of a batch search: either the full response for that query, or
/// the error that query produced. Slots are independent and keep the request
/// order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchSearchSlot {
	Hit(SearchResponse),
	Miss { error: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchSearchResponse {
	pub slots: Vec<BatchSearchSlot>,
}

impl HearthService {
	/// Persists every item in one transaction. Any invalid or conflicting
	/// item aborts the whole batch; nothing is written.
	pub async fn batch_store(&self, request: BatchStoreRequest) -> Result<BatchStoreResponse> {
		if request.items.is_empty() {
			return Err(Error::InvalidRequest { message: "items must be non-empty.".to_string() });
		}

		self.with_deadline(request.timeout_ms, async {
			let now = OffsetDateTime::now_utc();
			let mut memories = Vec::with_capacity(request.items.len());

			for (index, item) in request.items.iter().enumerate() {
				let memory = self.prepare_memory(item, now).map_err(|err| match err {
					Error::InvalidRequest { message } =>
						Error::InvalidRequest { message: format!("items[{index}]: {message}") },
					other => other,
				})?;

				memories.push(memory);
			}

			let mut tx = self.db.pool.begin().await?;

			for memory in &memories {
				queries::ensure_user(&mut *tx, memory.owner_id).await?;
				queries::insert_memory(&mut *tx, memory).await?;
			}

			tx.commit().await?;

			let ids = memories.iter().map(|memory| memory.memory_id).collect::<Vec<_>>();
			let count = ids.len() as u64;

			Ok(BatchStoreResponse { success: true, ids, count })
		})
		.await
	}

	/// Runs every query in request order. A failing query fills its own slot
	/// with the error and leaves the other slots untouched.
	pub async fn batch_search(&self, request: BatchSearchRequest) -> Result<BatchSearchResponse> {
		self.with_deadline(request.timeout_ms, async {
			let mut slots = Vec::with_capacity(request.queries.len());

			for query in request.queries {
				match self.search(query).await {
					Ok(response) => slots.push(BatchSearchSlot::Hit(response)),
					Err(err) => slots.push(BatchSearchSlot::Miss { error: err.to_string() }),
				}
			}

			Ok(BatchSearchResponse { slots })
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::search::{SearchMeta, SearchMode};

	#[test]
	fn miss_slot_serializes_as_an_error_object() {
		let slot =
			BatchSearchSlot::Miss { error: "Invalid request: owner_id is required.".to_string() };
		let value = serde_json::to_value(&slot).expect("Expected slot to serialize.");

		assert_eq!(value, serde_json::json!({ "error": "Invalid request: owner_id is required." }));
	}

	#[test]
	fn hit_slot_serializes_the_full_response() {
		let slot = BatchSearchSlot::Hit(SearchResponse {
			results: Vec::new(),
			meta: SearchMeta {
				mode: SearchMode::Chronological,
				applied_filters: Vec::new(),
				limit: 50,
				shared_thread: false,
			},
		});
		let value = serde_json::to_value(&slot).expect("Expected slot to serialize.");

		assert!(value.get("results").is_some());
		assert_eq!(value["meta"]["mode"], serde_json::json!("chronological"));
	}

	#[test]
	fn batch_store_request_deserializes_items() {
		let request: BatchStoreRequest = serde_json::from_value(serde_json::json!({
			"items": [
				{ "owner_id": "ada", "content": "Coffee", "amount": 4.5 },
				{ "owner_id": "ada", "content": "Lunch", "amount": 12.0 },
			],
		}))
		.expect("Expected request to deserialize.");

		assert_eq!(request.items.len(), 2);
		assert_eq!(request.timeout_ms, None);
	}
}
