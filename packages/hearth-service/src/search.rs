use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, HearthService, Result,
	filter::{self, MemoryFilter, OwnerScope, Predicate},
};
use hearth_storage::models::ScoredMemoryRow;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub owner_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub query: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub filter: Option<MemoryFilter>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub query_embedding: Option<Vec<f32>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}

/// How a search was ranked; echoed to the caller in `meta`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
	Vector,
	Trigram,
	Chronological,
}
impl SearchMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Vector => "vector",
			Self::Trigram => "trigram",
			Self::Chronological => "chronological",
		}
	}
}

/// Ranking strategy plus the term it binds into the query.
///
/// An embedding always wins over a text query. A text query without the
/// trigram extension degrades to chronological order rather than failing;
/// `meta.mode` tells the caller which ranking actually ran.
enum Ranking {
	Vector(String),
	Trigram(String),
	Chronological,
}
impl Ranking {
	fn choose(vector: Option<String>, query: Option<&str>, trigram_available: bool) -> Self {
		if let Some(vector) = vector {
			return Self::Vector(vector);
		}
		if let Some(query) = query
			&& trigram_available
		{
			return Self::Trigram(query.to_string());
		}

		Self::Chronological
	}

	fn mode(&self) -> SearchMode {
		match self {
			Self::Vector(_) => SearchMode::Vector,
			Self::Trigram(_) => SearchMode::Trigram,
			Self::Chronological => SearchMode::Chronological,
		}
	}

	fn push_select(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		match self {
			Self::Vector(vector) => {
				builder.push("1 - (embedding <=> ");
				builder.push_bind(vector.clone());
				builder.push("::text::vector) AS similarity");
			},
			Self::Trigram(query) => {
				builder.push("similarity(content, ");
				builder.push_bind(query.clone());
				builder.push(")::double precision AS similarity");
			},
			Self::Chronological => {
				builder.push("NULL::double precision AS similarity");
			},
		}
	}

	fn push_order(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		builder.push(" ORDER BY ");

		match self {
			// The bare distance form is what the HNSW index planner matches.
			Self::Vector(vector) => {
				builder.push("embedding <=> ");
				builder.push_bind(vector.clone());
				builder.push("::text::vector, ");
			},
			Self::Trigram(query) => {
				builder.push("similarity(content, ");
				builder.push_bind(query.clone());
				builder.push(") DESC, ");
			},
			Self::Chronological => {},
		}

		builder.push("occurred_at DESC NULLS LAST, created_at DESC");
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchItem {
	pub id: Uuid,
	pub owner_id: Uuid,
	pub content: String,
	pub attributes: Value,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub amount: Option<f64>,
	#[serde(with = "crate::time_serde::option", default, skip_serializing_if = "Option::is_none")]
	pub occurred_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub similarity: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchMeta {
	pub mode: SearchMode,
	pub applied_filters: Vec<String>,
	pub limit: u32,
	pub shared_thread: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub results: Vec<SearchItem>,
	pub meta: SearchMeta,
}

impl HearthService {
	/// Retrieves memories ranked by vector similarity, trigram similarity, or
	/// recency, depending on which query inputs are present.
	pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
		self.with_deadline(request.timeout_ms, async {
			let filter = request.filter.clone().unwrap_or_default();
			let owners = if filter.shared_thread {
				None
			} else {
				let raw = request.owner_id.as_deref().unwrap_or("");

				Some(OwnerScope::One(self.resolve_owner(raw)?))
			};

			if let Some(embedding) = request.query_embedding.as_ref() {
				let expected = self.cfg.engine.vector_dim as usize;

				if embedding.len() != expected {
					return Err(Error::InvalidRequest {
						message: format!(
							"query_embedding must have {expected} dimensions, got {}.",
							embedding.len()
						),
					});
				}
				if !self.capabilities.vector {
					return Err(Error::Unavailable {
						message: "The vector extension is not installed; vector search is unavailable."
							.to_string(),
					});
				}
			}

			let query = request.query.as_deref().map(str::trim).filter(|query| !query.is_empty());
			let ranking = Ranking::choose(
				request.query_embedding.as_deref().map(crate::vector_to_pg),
				query,
				self.capabilities.trigram,
			);
			let mode = ranking.mode();
			let mut compiled =
				filter::compile(owners, &filter, self.cfg.engine.default_search_limit)?;

			if mode == SearchMode::Vector {
				compiled.predicates.push(Predicate::HasEmbedding);
			}

			tracing::debug!(mode = mode.as_str(), limit = compiled.limit, "Executing search.");

			let mut builder = QueryBuilder::<Postgres>::new(
				"SELECT memory_id, owner_id, content, attributes, amount, occurred_at, created_at, ",
			);

			ranking.push_select(&mut builder);
			builder.push(" FROM memories");
			compiled.push_where(&mut builder);
			ranking.push_order(&mut builder);
			builder.push(" LIMIT ");
			builder.push_bind(i64::from(compiled.limit));

			let rows: Vec<ScoredMemoryRow> =
				builder.build_query_as().fetch_all(&self.db.pool).await?;
			let results = rows
				.into_iter()
				.map(|row| SearchItem {
					id: row.memory_id,
					owner_id: row.owner_id,
					content: row.content,
					attributes: row.attributes,
					amount: row.amount,
					occurred_at: row.occurred_at,
					created_at: row.created_at,
					similarity: row.similarity,
				})
				.collect();

			Ok(SearchResponse {
				results,
				meta: SearchMeta {
					mode,
					applied_filters: compiled.applied,
					limit: compiled.limit,
					shared_thread: compiled.shared_thread,
				},
			})
		})
		.await
	}
}
