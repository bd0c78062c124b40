mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Engine, Postgres, Service, Storage};

use std::{fs, path::Path};

/// Hard cap on results per read. `engine.default_search_limit` must stay at or
/// below it; the read paths clamp caller limits to it.
pub const MAX_SEARCH_LIMIT: u32 = 200;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.postgres.acquire_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.acquire_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.engine.vector_dim == 0 {
		return Err(Error::Validation {
			message: "engine.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.engine.vector_dim > 16_000 {
		return Err(Error::Validation {
			message: "engine.vector_dim must be 16,000 or less.".to_string(),
		});
	}
	if cfg.engine.default_search_limit == 0 {
		return Err(Error::Validation {
			message: "engine.default_search_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.engine.default_search_limit > MAX_SEARCH_LIMIT {
		return Err(Error::Validation {
			message: format!("engine.default_search_limit must be {MAX_SEARCH_LIMIT} or less."),
		});
	}
	if cfg.engine.default_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "engine.default_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.engine.max_timeout_ms < cfg.engine.default_timeout_ms {
		return Err(Error::Validation {
			message: "engine.max_timeout_ms must be at least engine.default_timeout_ms."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let trimmed = cfg.service.log_level.trim();

	if trimmed.is_empty() {
		cfg.service.log_level = "info".to_string();
	} else if trimmed.len() != cfg.service.log_level.len() {
		cfg.service.log_level = trimmed.to_string();
	}

	cfg.service.http_bind = cfg.service.http_bind.trim().to_string();
	cfg.storage.postgres.dsn = cfg.storage.postgres.dsn.trim().to_string();
}
