use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub engine: Engine,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	/// Binding to a non-loopback address is refused unless this is set.
	#[serde(default)]
	pub allow_public_bind: bool,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	#[serde(default = "default_pool_max_conns")]
	pub pool_max_conns: u32,
	#[serde(default = "default_acquire_timeout_ms")]
	pub acquire_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Engine {
	/// Must match the dimension of every embedding sent to the store.
	pub vector_dim: u32,
	#[serde(default = "default_search_limit")]
	pub default_search_limit: u32,
	#[serde(default = "default_timeout_ms")]
	pub default_timeout_ms: u64,
	#[serde(default = "default_max_timeout_ms")]
	pub max_timeout_ms: u64,
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_pool_max_conns() -> u32 {
	8
}

fn default_acquire_timeout_ms() -> u64 {
	5_000
}

fn default_search_limit() -> u32 {
	50
}

fn default_timeout_ms() -> u64 {
	10_000
}

fn default_max_timeout_ms() -> u64 {
	30_000
}
