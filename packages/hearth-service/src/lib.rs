pub mod aggregate;
pub mod batch;
pub mod delete;
pub mod filter;
pub mod manifest;
pub mod reminders;
pub mod search;
pub mod store;
pub mod time_serde;
pub mod update;

mod error;

use std::future::Future;

use uuid::Uuid;

pub use aggregate::{
	AggregateGroup, AggregateMeta, AggregateOp, AggregateRequest, AggregateResponse, GroupPeriod,
};
pub use batch::{
	BatchSearchRequest, BatchSearchResponse, BatchSearchSlot, BatchStoreRequest, BatchStoreResponse,
};
pub use delete::{SoftDeleteRequest, SoftDeleteResponse};
pub use error::{Error, Result};
pub use filter::{CompiledFilter, MemoryFilter, OwnerScope, Predicate};
pub use manifest::{Manifest, ManifestLimits, ParamSpec, VerbSpec};
pub use reminders::{
	GetPendingRemindersRequest, GetPendingRemindersResponse, MarkReminderSentRequest,
	MarkReminderSentResponse, PendingReminder, ScheduleReminderRequest, ScheduleReminderResponse,
};
pub use search::{SearchItem, SearchMeta, SearchMode, SearchRequest, SearchResponse};
pub use store::{StoreItem, StoreRequest, StoreResponse};
pub use update::{UpdateFields, UpdateFieldsRequest, UpdateFieldsResponse};

use hearth_config::Config;
use hearth_storage::db::{BootstrapReport, Db};

/// Which optional Postgres extensions the bootstrap managed to enable.
///
/// Search consults these to pick a ranking mode; a store without pg_trgm
/// still serves text queries, just chronologically.
#[derive(Clone, Copy, Debug)]
pub struct StoreCapabilities {
	pub vector: bool,
	pub trigram: bool,
}

pub struct HearthService {
	pub cfg: Config,
	pub db: Db,
	pub capabilities: StoreCapabilities,
}
impl HearthService {
	pub fn new(cfg: Config, db: Db, report: &BootstrapReport) -> Self {
		let capabilities = StoreCapabilities {
			vector: report.vector_available(),
			trigram: report.trigram_available(),
		};

		Self { cfg, db, capabilities }
	}

	/// Runs `operation` under the caller-supplied deadline, clamped to the
	/// configured maximum.
	///
	/// On expiry the operation future is dropped, which returns any pooled
	/// connection it held.
	pub(crate) async fn with_deadline<T>(
		&self,
		timeout_ms: Option<u64>,
		operation: impl Future<Output = Result<T>>,
	) -> Result<T> {
		let timeout_ms = timeout_ms
			.unwrap_or(self.cfg.engine.default_timeout_ms)
			.min(self.cfg.engine.max_timeout_ms);

		match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), operation).await {
			Ok(result) => result,
			Err(_) => Err(Error::Timeout { timeout_ms }),
		}
	}

	pub(crate) fn resolve_owner(&self, raw: &str) -> Result<Uuid> {
		if raw.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "owner_id is required.".to_string() });
		}

		Ok(hearth_domain::identity::resolve(raw))
	}
}

pub(crate) fn vector_to_pg(embedding: &[f32]) -> String {
	let components =
		embedding.iter().map(|component| component.to_string()).collect::<Vec<_>>().join(",");

	format!("[{components}]")
}
