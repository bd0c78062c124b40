use serde_json::{Map, Value};

/// Conventional attribute keys mirrored into dedicated text columns on
/// `memories`. `deleted` is projected separately as a boolean.
const TEXT_KEYS: [&str; 9] = [
	"type",
	"thread_id",
	"category",
	"person",
	"metric",
	"subject",
	"source",
	"value",
	"external_id",
];

/// Returns the projected column backing a conventional attribute key, or
/// `None` when the key only lives inside the JSONB document.
pub fn text_column(key: &str) -> Option<&'static str> {
	TEXT_KEYS.iter().find(|candidate| **candidate == key).copied()
}

/// Values pulled out of an attribute object for the projected columns.
///
/// Derived exclusively from `attributes`. The columns are a read-path
/// optimization and are never written independently of the document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Projection {
	pub memory_type: Option<String>,
	pub thread_id: Option<String>,
	pub category: Option<String>,
	pub person: Option<String>,
	pub metric: Option<String>,
	pub subject: Option<String>,
	pub source: Option<String>,
	pub value: Option<String>,
	pub deleted: bool,
	pub external_id: Option<String>,
}

impl Projection {
	/// Derives the projected values from an attribute object.
	///
	/// Only string values project into the text columns. A conventional key
	/// holding a number or object stays queryable through containment but
	/// leaves its column `NULL`.
	pub fn derive(attributes: &Value) -> Self {
		let text = |key: &str| attributes.get(key).and_then(Value::as_str).map(str::to_string);

		Self {
			memory_type: text("type"),
			thread_id: text("thread_id"),
			category: text("category"),
			person: text("person"),
			metric: text("metric"),
			subject: text("subject"),
			source: text("source"),
			value: text("value"),
			deleted: attributes.get("deleted").and_then(Value::as_bool).unwrap_or(false),
			external_id: text("external_id"),
		}
	}
}

/// Shallow merge of `patch` into `base`.
///
/// Patch keys replace base keys wholesale, explicit nulls included; nested
/// objects are not merged recursively.
pub fn merge_attributes(base: &Value, patch: &Value) -> Value {
	let mut merged = match base.as_object() {
		Some(object) => object.clone(),
		None => Map::new(),
	};

	if let Some(patch) = patch.as_object() {
		for (key, value) in patch {
			merged.insert(key.clone(), value.clone());
		}
	}

	Value::Object(merged)
}
