use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Result, schema};

const BOOTSTRAP_LOCK_ID: i64 = 432_784;

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &hearth_config::Postgres) -> Result<Self> {
		let pool = PgPoolOptions::new()
			.max_connections(cfg.pool_max_conns)
			.acquire_timeout(Duration::from_millis(cfg.acquire_timeout_ms))
			.connect(&cfg.dsn)
			.await?;

		Ok(Self { pool })
	}

	/// Applies the idempotent schema, one statement at a time.
	///
	/// A failing statement is logged and recorded in the report instead of
	/// aborting the run; a missing extension must not take the whole store
	/// down. Correctness under concurrent bootstraps comes from every
	/// statement being `IF NOT EXISTS` — the advisory lock only narrows the
	/// window in which two processes race on the same statement.
	pub async fn ensure_ready(&self, vector_dim: u32) -> Result<BootstrapReport> {
		let statements = schema::statements(vector_dim);
		let mut conn = self.pool.acquire().await?;

		// The lock is session-scoped, so it has to be released on this same
		// connection. No early returns between acquire and unlock.
		sqlx::query("SELECT pg_advisory_lock($1)")
			.bind(BOOTSTRAP_LOCK_ID)
			.execute(&mut *conn)
			.await?;

		let mut report = BootstrapReport::default();

		for statement in &statements {
			match sqlx::query(statement.sql.as_str()).execute(&mut *conn).await {
				Ok(_) => report.applied.push(statement.label.clone()),
				Err(err) => {
					tracing::warn!(
						statement = %statement.label,
						error = %err,
						"Bootstrap statement skipped."
					);

					report.skipped.push(SkippedStatement {
						label: statement.label.clone(),
						error: err.to_string(),
					});
				},
			}
		}

		if let Err(err) = sqlx::query("SELECT pg_advisory_unlock($1)")
			.bind(BOOTSTRAP_LOCK_ID)
			.execute(&mut *conn)
			.await
		{
			tracing::warn!(error = %err, "Failed to release the bootstrap advisory lock.");
		}

		Ok(report)
	}
}

/// Outcome of a schema bootstrap run.
#[derive(Debug, Default)]
pub struct BootstrapReport {
	pub applied: Vec<String>,
	pub skipped: Vec<SkippedStatement>,
}

#[derive(Debug)]
pub struct SkippedStatement {
	pub label: String,
	pub error: String,
}

impl BootstrapReport {
	pub fn vector_available(&self) -> bool {
		self.applied.iter().any(|label| label == "vector")
	}

	pub fn trigram_available(&self) -> bool {
		self.applied.iter().any(|label| label == "pg_trgm")
	}
}
