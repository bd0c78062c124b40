use serde::{Deserialize, Serialize};

use crate::{HearthService, filter};
use hearth_config::Config;

/// Machine-readable description of what this deployment can do, built for
/// callers that discover the API instead of hard-coding it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
	pub engine: String,
	pub version: String,
	pub limits: ManifestLimits,
	pub verbs: Vec<VerbSpec>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestLimits {
	pub vector_dim: u32,
	pub default_search_limit: u32,
	pub max_search_limit: u32,
	pub shared_thread_limit: u32,
	pub default_timeout_ms: u64,
	pub max_timeout_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerbSpec {
	pub name: String,
	pub params: Vec<ParamSpec>,
	pub latency_budget_ms: u64,
	pub idempotent: bool,
	pub failure_modes: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamSpec {
	pub name: String,
	pub kind: String,
	pub required: bool,
}

fn param(name: &str, kind: &str, required: bool) -> ParamSpec {
	ParamSpec { name: name.to_string(), kind: kind.to_string(), required }
}

fn verb(
	name: &str,
	params: Vec<ParamSpec>,
	latency_budget_ms: u64,
	idempotent: bool,
	failure_modes: &[&str],
) -> VerbSpec {
	VerbSpec {
		name: name.to_string(),
		params,
		latency_budget_ms,
		idempotent,
		failure_modes: failure_modes.iter().map(|mode| (*mode).to_string()).collect(),
	}
}

pub fn build(cfg: &Config) -> Manifest {
	// owner_id is not marked required on reads because shared-thread queries
	// run without one.
	let verbs = vec![
		verb(
			"store",
			vec![
				param("owner_id", "string", true),
				param("content", "string", true),
				param("attributes", "object", false),
				param("amount", "number", false),
				param("occurred_at", "timestamp", false),
				param("embedding", "vector", false),
				param("timeout_ms", "number", false),
			],
			250,
			false,
			&[
				"validation_error",
				"conflict",
				"backing_store_unavailable",
				"timeout",
				"storage_error",
			],
		),
		verb(
			"search",
			vec![
				param("owner_id", "string", false),
				param("query", "string", false),
				param("query_embedding", "vector", false),
				param("filter", "object", false),
				param("timeout_ms", "number", false),
			],
			250,
			true,
			&["validation_error", "backing_store_unavailable", "timeout", "storage_error"],
		),
		verb(
			"aggregate",
			vec![
				param("owner_id", "string", false),
				param("owner_ids", "array", false),
				param("operation", "string", true),
				param("field", "string", false),
				param("filter", "object", false),
				param("timeout_ms", "number", false),
			],
			500,
			true,
			&["validation_error", "backing_store_unavailable", "timeout", "storage_error"],
		),
		verb(
			"batch_store",
			vec![param("items", "array", true), param("timeout_ms", "number", false)],
			1_000,
			false,
			&[
				"validation_error",
				"conflict",
				"backing_store_unavailable",
				"timeout",
				"storage_error",
			],
		),
		verb(
			"batch_search",
			vec![param("queries", "array", true), param("timeout_ms", "number", false)],
			1_000,
			true,
			&["backing_store_unavailable", "timeout", "storage_error"],
		),
		verb(
			"update_fields",
			vec![
				param("id", "string", true),
				param("fields", "object", true),
				param("timeout_ms", "number", false),
			],
			250,
			true,
			&[
				"validation_error",
				"not_found",
				"conflict",
				"backing_store_unavailable",
				"timeout",
				"storage_error",
			],
		),
		verb(
			"soft_delete",
			vec![param("id", "string", true), param("timeout_ms", "number", false)],
			250,
			true,
			&["not_found", "backing_store_unavailable", "timeout", "storage_error"],
		),
		verb(
			"schedule_reminder",
			vec![
				param("memory_id", "string", true),
				param("fire_at", "timestamp", true),
				param("payload", "object", false),
				param("idempotency_key", "string", false),
				param("timeout_ms", "number", false),
			],
			250,
			true,
			&[
				"validation_error",
				"not_found",
				"backing_store_unavailable",
				"timeout",
				"storage_error",
			],
		),
		verb(
			"get_pending_reminders",
			vec![param("owner_id", "string", true), param("timeout_ms", "number", false)],
			250,
			true,
			&["validation_error", "backing_store_unavailable", "timeout", "storage_error"],
		),
		verb(
			"mark_reminder_sent",
			vec![param("reminder_id", "string", true), param("timeout_ms", "number", false)],
			250,
			true,
			&["not_found", "backing_store_unavailable", "timeout", "storage_error"],
		),
	];

	Manifest {
		engine: "hearth".to_string(),
		version: env!("CARGO_PKG_VERSION").to_string(),
		limits: ManifestLimits {
			vector_dim: cfg.engine.vector_dim,
			default_search_limit: cfg.engine.default_search_limit,
			max_search_limit: filter::MAX_SEARCH_LIMIT,
			shared_thread_limit: filter::SHARED_THREAD_LIMIT,
			default_timeout_ms: cfg.engine.default_timeout_ms,
			max_timeout_ms: cfg.engine.max_timeout_ms,
		},
		verbs,
	}
}

impl HearthService {
	pub fn manifest(&self) -> Manifest {
		build(&self.cfg)
	}
}
