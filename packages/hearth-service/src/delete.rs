use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{HearthService, Result, update::UpdateFields};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SoftDeleteRequest {
	pub id: Uuid,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SoftDeleteResponse {
	pub success: bool,
	pub id: Uuid,
}

impl HearthService {
	/// Marks a memory deleted without destroying the row. Reads skip deleted
	/// rows unless the filter opts in with `include_deleted`; repeating the
	/// call is a no-op.
	pub async fn soft_delete(&self, request: SoftDeleteRequest) -> Result<SoftDeleteResponse> {
		self.with_deadline(request.timeout_ms, async {
			let fields =
				UpdateFields { attributes: Some(json!({ "deleted": true })), ..Default::default() };
			let updated = self.apply_update(request.id, fields).await?;

			Ok(SoftDeleteResponse { success: updated.success, id: updated.id })
		})
		.await
	}
}
