use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result};
use hearth_domain::projection;

/// Hard cap on results per read. Defined by `hearth_config`, which rejects a
/// `default_search_limit` above it at load time.
pub const MAX_SEARCH_LIMIT: u32 = hearth_config::MAX_SEARCH_LIMIT;
/// Lower cap when shared-thread mode relaxes the owner predicate; without it
/// a thread query could scan broadly across users.
pub const SHARED_THREAD_LIMIT: u32 = 30;

/// Structured constraints accepted by every read verb.
///
/// `group_by` and `group_by_field` are only meaningful to aggregation and are
/// ignored by the predicate compiler.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryFilter {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thread_id: Option<String>,
	#[serde(rename = "type", skip_serializing_if = "Option::is_none")]
	pub memory_type: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub channel: Option<String>,
	#[serde(with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub date_from: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub date_to: Option<OffsetDateTime>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub min_amount: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_amount: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exact_match: Option<Map<String, Value>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub limit: Option<u32>,
	pub shared_thread: bool,
	pub include_deleted: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group_by: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group_by_field: Option<String>,
}

/// Owner constraint for a read: exactly one owner, or a household-wide set.
#[derive(Clone, Debug)]
pub enum OwnerScope {
	One(Uuid),
	Many(Vec<Uuid>),
}

/// One compiled constraint.
///
/// Column names are fixed `'static` strings chosen by the compiler; caller
/// values only ever reach the query as bound parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
	OwnerEq(Uuid),
	OwnerIn(Vec<Uuid>),
	ColumnEq { column: &'static str, value: String },
	ColumnEqBool { column: &'static str, value: bool },
	OccurredFrom(OffsetDateTime),
	OccurredTo(OffsetDateTime),
	AmountMin(f64),
	AmountMax(f64),
	AttrContains { object: Value },
	NotDeleted,
	HasEmbedding,
}

/// Compiled form of a [`MemoryFilter`]: ordered predicates, effective limit,
/// and the filter keys that produced predicates.
#[derive(Clone, Debug)]
pub struct CompiledFilter {
	pub predicates: Vec<Predicate>,
	pub limit: u32,
	pub shared_thread: bool,
	pub applied: Vec<String>,
}
impl CompiledFilter {
	/// Appends a `WHERE` clause covering every predicate. Returns whether
	/// anything was written, so callers can keep appending with `AND`.
	pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) -> bool {
		if self.predicates.is_empty() {
			return false;
		}

		builder.push(" WHERE ");

		for (index, predicate) in self.predicates.iter().enumerate() {
			if index > 0 {
				builder.push(" AND ");
			}

			match predicate {
				Predicate::OwnerEq(owner_id) => {
					builder.push("owner_id = ");
					builder.push_bind(*owner_id);
				},
				Predicate::OwnerIn(owner_ids) => {
					builder.push("owner_id = ANY(");
					builder.push_bind(owner_ids.clone());
					builder.push(")");
				},
				Predicate::ColumnEq { column, value } => {
					builder.push(*column);
					builder.push(" = ");
					builder.push_bind(value.clone());
				},
				Predicate::ColumnEqBool { column, value } => {
					builder.push(*column);
					builder.push(" = ");
					builder.push_bind(*value);
				},
				Predicate::OccurredFrom(from) => {
					builder.push("occurred_at >= ");
					builder.push_bind(*from);
				},
				Predicate::OccurredTo(to) => {
					builder.push("occurred_at <= ");
					builder.push_bind(*to);
				},
				Predicate::AmountMin(min) => {
					builder.push("amount >= ");
					builder.push_bind(*min);
				},
				Predicate::AmountMax(max) => {
					builder.push("amount <= ");
					builder.push_bind(*max);
				},
				Predicate::AttrContains { object } => {
					builder.push("attributes @> ");
					builder.push_bind(object.clone());
				},
				Predicate::NotDeleted => {
					builder.push("deleted = FALSE");
				},
				Predicate::HasEmbedding => {
					builder.push("embedding IS NOT NULL");
				},
			}
		}

		true
	}
}

/// Compiles a declarative filter into predicates.
///
/// Outside shared-thread mode an owner constraint is mandatory and always
/// emitted first. In shared-thread mode the owner predicate is dropped and
/// `thread_id` becomes required to keep the scan bounded to one conversation.
pub fn compile(
	owners: Option<OwnerScope>,
	filter: &MemoryFilter,
	default_limit: u32,
) -> Result<CompiledFilter> {
	let mut predicates = Vec::new();
	let mut applied = Vec::new();

	if filter.shared_thread {
		if filter.thread_id.as_deref().map(str::trim).unwrap_or("").is_empty() {
			return Err(Error::InvalidRequest {
				message: "shared_thread requires thread_id.".to_string(),
			});
		}
	} else {
		match owners {
			Some(OwnerScope::One(owner_id)) => predicates.push(Predicate::OwnerEq(owner_id)),
			Some(OwnerScope::Many(owner_ids)) => predicates.push(Predicate::OwnerIn(owner_ids)),
			None =>
				return Err(Error::InvalidRequest { message: "owner_id is required.".to_string() }),
		}
	}

	if let Some(thread_id) = filter.thread_id.as_deref().map(str::trim)
		&& !thread_id.is_empty()
	{
		predicates.push(Predicate::ColumnEq { column: "thread_id", value: thread_id.to_string() });
		applied.push("thread_id".to_string());
	}
	if let Some(memory_type) = filter.memory_type.as_deref().map(str::trim)
		&& !memory_type.is_empty()
	{
		predicates.push(Predicate::ColumnEq { column: "type", value: memory_type.to_string() });
		applied.push("type".to_string());
	}
	if let Some(channel) = filter.channel.as_deref().map(str::trim)
		&& !channel.is_empty()
	{
		// channel has no projected column; it rides the containment index.
		predicates.push(Predicate::AttrContains { object: json!({ "channel": channel }) });
		applied.push("channel".to_string());
	}
	if let Some(date_from) = filter.date_from {
		predicates.push(Predicate::OccurredFrom(date_from));
		applied.push("date_from".to_string());
	}
	if let Some(date_to) = filter.date_to {
		predicates.push(Predicate::OccurredTo(date_to));
		applied.push("date_to".to_string());
	}
	if let Some(min_amount) = filter.min_amount {
		predicates.push(Predicate::AmountMin(min_amount));
		applied.push("min_amount".to_string());
	}
	if let Some(max_amount) = filter.max_amount {
		predicates.push(Predicate::AmountMax(max_amount));
		applied.push("max_amount".to_string());
	}

	let mut deleted_pinned = false;

	if let Some(exact_match) = filter.exact_match.as_ref()
		&& !exact_match.is_empty()
	{
		for (key, value) in exact_match {
			let predicate = route_exact_match(key, value);

			if matches!(predicate, Predicate::ColumnEqBool { column: "deleted", .. }) {
				deleted_pinned = true;
			}

			predicates.push(predicate);
		}

		applied.push("exact_match".to_string());
	}
	// An explicit deleted exact match pins the column; the implicit guard would contradict it.
	if !filter.include_deleted && !deleted_pinned {
		predicates.push(Predicate::NotDeleted);
	}

	let cap = if filter.shared_thread { SHARED_THREAD_LIMIT } else { MAX_SEARCH_LIMIT };
	let limit = filter.limit.unwrap_or(default_limit).clamp(1, cap);

	Ok(CompiledFilter { predicates, limit, shared_thread: filter.shared_thread, applied })
}

/// Routes one `exact_match` entry to the fastest predicate that is still
/// correct: a projected column when the key is conventional and the value is
/// the projected shape, otherwise JSONB containment.
fn route_exact_match(key: &str, value: &Value) -> Predicate {
	if key == "deleted"
		&& let Value::Bool(value) = value
	{
		return Predicate::ColumnEqBool { column: "deleted", value: *value };
	}
	if let Some(column) = projection::text_column(key)
		&& let Value::String(value) = value
	{
		return Predicate::ColumnEq { column, value: value.clone() };
	}

	let mut object = Map::new();

	object.insert(key.to_string(), value.clone());

	Predicate::AttrContains { object: Value::Object(object) }
}
