//! Helpers shared by the Postgres-backed acceptance tests. Every test builds
//! its own throwaway database so tests never see each other's rows.

use serde_json::Value;
use time::OffsetDateTime;

use hearth_config::{Config, Engine, Postgres, Service, Storage};
use hearth_service::{HearthService, StoreItem, StoreRequest};
use hearth_storage::db::Db;

pub const TEST_VECTOR_DIM: u32 = 4;

pub fn test_config(dsn: &str) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			allow_public_bind: false,
		},
		storage: Storage {
			postgres: Postgres {
				dsn: dsn.to_string(),
				pool_max_conns: 2,
				acquire_timeout_ms: 5_000,
			},
		},
		engine: Engine {
			vector_dim: TEST_VECTOR_DIM,
			default_search_limit: 50,
			default_timeout_ms: 10_000,
			max_timeout_ms: 30_000,
		},
	}
}

pub async fn build_service(dsn: &str) -> HearthService {
	let cfg = test_config(dsn);
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");
	let report =
		db.ensure_ready(cfg.engine.vector_dim).await.expect("Failed to bootstrap the schema.");

	HearthService::new(cfg, db, &report)
}

pub fn item(owner_id: &str, content: &str) -> StoreItem {
	StoreItem {
		owner_id: owner_id.to_string(),
		content: content.to_string(),
		attributes: None,
		amount: None,
		occurred_at: None,
		embedding: None,
	}
}

pub fn item_with(
	owner_id: &str,
	content: &str,
	attributes: Value,
	amount: Option<f64>,
	occurred_at: Option<OffsetDateTime>,
) -> StoreItem {
	StoreItem {
		owner_id: owner_id.to_string(),
		content: content.to_string(),
		attributes: Some(attributes),
		amount,
		occurred_at,
		embedding: None,
	}
}

pub async fn store(service: &HearthService, item: StoreItem) -> uuid::Uuid {
	service
		.store(StoreRequest { item, timeout_ms: None })
		.await
		.expect("Failed to store a memory.")
		.id
}
