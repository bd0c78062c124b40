use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::{
	Error, HearthService, Result,
	filter::{self, MemoryFilter, OwnerScope},
};
use hearth_domain::projection;

/// Attribute strings must look like this before they are cast to `double
/// precision`; anything else aggregates as NULL instead of erroring.
const NUMERIC_SHAPE: &str = r"^-?[0-9]+(\.[0-9]+)?$";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggregateOp {
	Sum,
	Count,
	Avg,
	Min,
	Max,
}
impl AggregateOp {
	pub fn parse(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"sum" => Ok(Self::Sum),
			"count" => Ok(Self::Count),
			"avg" => Ok(Self::Avg),
			"min" => Ok(Self::Min),
			"max" => Ok(Self::Max),
			_ => Err(Error::InvalidRequest {
				message: "operation must be one of sum, count, avg, min, or max.".to_string(),
			}),
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Sum => "sum",
			Self::Count => "count",
			Self::Avg => "avg",
			Self::Min => "min",
			Self::Max => "max",
		}
	}

	fn sql_name(&self) -> &'static str {
		match self {
			Self::Sum => "SUM",
			Self::Count => "COUNT",
			Self::Avg => "AVG",
			Self::Min => "MIN",
			Self::Max => "MAX",
		}
	}
}

/// Time bucket for `group_by`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupPeriod {
	Day,
	Week,
	Month,
}
impl GroupPeriod {
	pub fn parse(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"day" => Ok(Self::Day),
			"week" => Ok(Self::Week),
			"month" => Ok(Self::Month),
			_ => Err(Error::InvalidRequest {
				message: "group_by must be one of day, week, or month.".to_string(),
			}),
		}
	}

	fn date_trunc_arg(&self) -> &'static str {
		match self {
			Self::Day => "day",
			Self::Week => "week",
			Self::Month => "month",
		}
	}
}

/// What the aggregate function runs over.
#[derive(Debug)]
enum ValueExpr {
	Count,
	Amount,
	Attribute(String),
}
impl ValueExpr {
	fn push(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		match self {
			Self::Count => {},
			Self::Amount => {
				builder.push("amount");
			},
			Self::Attribute(field) => {
				builder.push("CASE WHEN attributes->>");
				builder.push_bind(field.clone());
				builder.push(" ~ ");
				builder.push_bind(NUMERIC_SHAPE.to_string());
				builder.push(" THEN (attributes->>");
				builder.push_bind(field.clone());
				builder.push(")::double precision END");
			},
		}
	}
}

/// One grouping dimension. Period buckets come from `date_trunc` over the
/// best-known timestamp; field buckets prefer the projected column when the
/// key is conventional.
enum Bucket {
	Period(GroupPeriod),
	Column(&'static str),
	Attribute(String),
}
impl Bucket {
	fn push(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		match self {
			Self::Period(period) => {
				builder.push("to_char(date_trunc('");
				builder.push(period.date_trunc_arg());
				builder.push("', COALESCE(occurred_at, created_at)), 'YYYY-MM-DD')");
			},
			Self::Column(column) => {
				builder.push(*column);
			},
			Self::Attribute(field) => {
				builder.push("attributes->>");
				builder.push_bind(field.clone());
			},
		}
	}

	/// Period buckets never produce NULL; rows without the grouping value are
	/// excluded for the other two.
	fn needs_null_guard(&self) -> bool {
		!matches!(self, Self::Period(_))
	}
}

fn value_expr(op: AggregateOp, field: Option<&str>) -> Result<ValueExpr> {
	if op == AggregateOp::Count {
		return Ok(ValueExpr::Count);
	}

	match field {
		Some("amount") => Ok(ValueExpr::Amount),
		Some(field) => Ok(ValueExpr::Attribute(field.to_string())),
		None => Err(Error::InvalidRequest {
			message: format!("field is required for {} aggregation.", op.as_str()),
		}),
	}
}

fn route_group_field(field: &str) -> Bucket {
	if let Some(column) = projection::text_column(field) {
		Bucket::Column(column)
	} else {
		Bucket::Attribute(field.to_string())
	}
}

fn push_aggregate(builder: &mut QueryBuilder<'_, Postgres>, op: AggregateOp, value: &ValueExpr) {
	if let ValueExpr::Count = value {
		builder.push("COUNT(*)::double precision");

		return;
	}

	builder.push(op.sql_name());
	builder.push("(");
	value.push(builder);
	builder.push(")");
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregateRequest {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owner_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owner_ids: Option<Vec<String>>,
	pub operation: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub field: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filter: Option<MemoryFilter>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregateGroup {
	pub group: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group_field: Option<String>,
	pub result: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregateMeta {
	pub applied_filters: Vec<String>,
	pub shared_thread: bool,
	pub owner_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregateResponse {
	pub operation: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<String>,
	pub result: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub groups: Option<Vec<AggregateGroup>>,
	pub filter: MemoryFilter,
	#[serde(rename = "_meta")]
	pub meta: AggregateMeta,
}

impl HearthService {
	/// Runs a numeric aggregation, optionally bucketed by time period and/or
	/// an attribute field.
	pub async fn aggregate(&self, request: AggregateRequest) -> Result<AggregateResponse> {
		self.with_deadline(request.timeout_ms, async {
			let op = AggregateOp::parse(&request.operation)?;
			let field =
				request.field.as_deref().map(str::trim).filter(|field| !field.is_empty());
			let value = value_expr(op, field)?;
			let filter = request.filter.clone().unwrap_or_default();
			let mut owners = Vec::new();

			if let Some(owner_id) = request.owner_id.as_deref()
				&& !owner_id.trim().is_empty()
			{
				owners.push(self.resolve_owner(owner_id)?);
			}
			if let Some(owner_ids) = request.owner_ids.as_ref() {
				for owner_id in owner_ids {
					if !owner_id.trim().is_empty() {
						owners.push(self.resolve_owner(owner_id)?);
					}
				}
			}

			owners.sort();
			owners.dedup();

			let owner_count = owners.len();
			let scope = match owners.len() {
				0 => None,
				1 => Some(OwnerScope::One(owners[0])),
				_ => Some(OwnerScope::Many(owners)),
			};
			let compiled = filter::compile(scope, &filter, self.cfg.engine.default_search_limit)?;
			let mut buckets = Vec::new();

			if let Some(group_by) = filter.group_by.as_deref().map(str::trim)
				&& !group_by.is_empty()
			{
				buckets.push(Bucket::Period(GroupPeriod::parse(group_by)?));
			}
			if let Some(group_field) = filter.group_by_field.as_deref().map(str::trim)
				&& !group_field.is_empty()
			{
				buckets.push(route_group_field(group_field));
			}

			tracing::debug!(
				operation = op.as_str(),
				grouped = !buckets.is_empty(),
				"Executing aggregation."
			);

			let (result, groups) = if buckets.is_empty() {
				let mut builder = QueryBuilder::<Postgres>::new("SELECT ");

				push_aggregate(&mut builder, op, &value);
				builder.push(" FROM memories");
				compiled.push_where(&mut builder);

				let result: Option<f64> =
					builder.build_query_scalar().fetch_one(&self.db.pool).await?;
				// An empty set sums and counts to zero; the other operations
				// have no meaningful answer and stay null.
				let result = match op {
					AggregateOp::Sum | AggregateOp::Count => Some(result.unwrap_or(0.)),
					_ => result,
				};

				(result, None)
			} else {
				let mut builder = QueryBuilder::<Postgres>::new("SELECT ");

				for bucket in &buckets {
					bucket.push(&mut builder);
					builder.push(", ");
				}

				push_aggregate(&mut builder, op, &value);
				builder.push(" FROM memories");

				let mut has_where = compiled.push_where(&mut builder);

				for bucket in &buckets {
					if bucket.needs_null_guard() {
						builder.push(if has_where { " AND " } else { " WHERE " });

						has_where = true;

						bucket.push(&mut builder);
						builder.push(" IS NOT NULL");
					}
				}
				if buckets.len() == 1 {
					builder.push(" GROUP BY 1 ORDER BY 1");

					let rows: Vec<(String, Option<f64>)> =
						builder.build_query_as().fetch_all(&self.db.pool).await?;
					let groups = rows
						.into_iter()
						.map(|(group, result)| AggregateGroup { group, group_field: None, result })
						.collect();

					(None, Some(groups))
				} else {
					builder.push(" GROUP BY 1, 2 ORDER BY 1, 2");

					let rows: Vec<(String, String, Option<f64>)> =
						builder.build_query_as().fetch_all(&self.db.pool).await?;
					let groups = rows
						.into_iter()
						.map(|(group, group_field, result)| AggregateGroup {
							group,
							group_field: Some(group_field),
							result,
						})
						.collect();

					(None, Some(groups))
				}
			};

			Ok(AggregateResponse {
				operation: op.as_str().to_string(),
				field: field.map(str::to_string),
				result,
				groups,
				filter,
				meta: AggregateMeta {
					applied_filters: compiled.applied,
					shared_thread: compiled.shared_thread,
					owner_count,
				},
			})
		})
		.await
	}
}
