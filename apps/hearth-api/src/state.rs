use std::sync::Arc;

use hearth_service::HearthService;
use hearth_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<HearthService>,
}
impl AppState {
	pub async fn new(config: hearth_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;
		let report = db.ensure_ready(config.engine.vector_dim).await?;

		if !report.skipped.is_empty() {
			tracing::warn!(
				skipped = report.skipped.len(),
				"Schema bootstrap completed with skipped statements."
			);
		}

		let service = HearthService::new(config, db, &report);

		Ok(Self { service: Arc::new(service) })
	}
}
