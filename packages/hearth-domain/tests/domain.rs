use serde_json::json;
use uuid::Uuid;

use hearth_domain::{Projection, identity, merge_attributes, projection};

#[test]
fn resolve_keeps_uuid_handles() {
	let id = Uuid::new_v4();

	assert_eq!(identity::resolve(&id.to_string()), id);
	assert_eq!(identity::resolve(&format!("  {id}  ")), id);
}

#[test]
fn resolve_hashes_free_form_handles_stably() {
	let first = identity::resolve("marta");
	let second = identity::resolve("marta");
	let other = identity::resolve("jonas");

	assert_eq!(first, second);
	assert_ne!(first, other);
	assert_eq!(identity::resolve("  marta  "), first);
}

#[test]
fn text_column_covers_conventional_keys_only() {
	assert_eq!(projection::text_column("type"), Some("type"));
	assert_eq!(projection::text_column("thread_id"), Some("thread_id"));
	assert_eq!(projection::text_column("external_id"), Some("external_id"));
	assert_eq!(projection::text_column("deleted"), None);
	assert_eq!(projection::text_column("channel"), None);
}

#[test]
fn derive_projects_string_values() {
	let attributes = json!({
		"type": "expense",
		"thread_id": "family",
		"category": "groceries",
		"person": "marta",
		"deleted": true,
		"external_id": "bank-123",
	});
	let projection = Projection::derive(&attributes);

	assert_eq!(projection.memory_type.as_deref(), Some("expense"));
	assert_eq!(projection.thread_id.as_deref(), Some("family"));
	assert_eq!(projection.category.as_deref(), Some("groceries"));
	assert_eq!(projection.person.as_deref(), Some("marta"));
	assert_eq!(projection.metric, None);
	assert!(projection.deleted);
	assert_eq!(projection.external_id.as_deref(), Some("bank-123"));
}

#[test]
fn derive_leaves_non_string_values_unprojected() {
	let attributes = json!({ "type": 7, "subject": { "nested": true }, "deleted": "yes" });
	let projection = Projection::derive(&attributes);

	assert_eq!(projection.memory_type, None);
	assert_eq!(projection.subject, None);
	assert!(!projection.deleted);
}

#[test]
fn derive_of_empty_object_is_default() {
	assert_eq!(Projection::derive(&json!({})), Projection::default());
}

#[test]
fn merge_replaces_keys_shallowly() {
	let base = json!({ "type": "note", "tags": { "a": 1 }, "person": "marta" });
	let patch = json!({ "tags": { "b": 2 }, "deleted": true });
	let merged = merge_attributes(&base, &patch);

	assert_eq!(
		merged,
		json!({
			"type": "note",
			"tags": { "b": 2 },
			"person": "marta",
			"deleted": true,
		})
	);
}

#[test]
fn merge_keeps_explicit_nulls() {
	let base = json!({ "person": "marta" });
	let patch = json!({ "person": null });
	let merged = merge_attributes(&base, &patch);

	assert_eq!(merged, json!({ "person": null }));
	assert_eq!(Projection::derive(&merged).person, None);
}

#[test]
fn merge_tolerates_non_object_base() {
	let merged = merge_attributes(&json!(null), &json!({ "type": "note" }));

	assert_eq!(merged, json!({ "type": "note" }));
}
