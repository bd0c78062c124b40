const EXTENSIONS_SQL: &str = include_str!("../../../sql/00_extensions.sql");
const USERS_SQL: &str = include_str!("../../../sql/01_users.sql");
const MEMORIES_SQL: &str = include_str!("../../../sql/02_memories.sql");
const REMINDERS_SQL: &str = include_str!("../../../sql/03_reminders.sql");
const INDEXES_SQL: &str = include_str!("../../../sql/04_indexes.sql");

/// One executable bootstrap statement.
#[derive(Clone, Debug)]
pub struct Statement {
	pub label: String,
	pub sql: String,
}

/// Renders the bootstrap statements in apply order.
///
/// Every statement is `IF NOT EXISTS`, so reapplying the list to a live
/// database is safe.
pub fn statements(vector_dim: u32) -> Vec<Statement> {
	let files = [EXTENSIONS_SQL, USERS_SQL, MEMORIES_SQL, REMINDERS_SQL, INDEXES_SQL];
	let mut statements = Vec::new();

	for file in files {
		let rendered = file.replace("<VECTOR_DIM>", &vector_dim.to_string());

		for chunk in rendered.split(';') {
			let sql = chunk.trim();

			if sql.is_empty() {
				continue;
			}

			statements.push(Statement { label: label_of(sql), sql: sql.to_string() });
		}
	}

	statements
}

/// Names a statement for logs and the bootstrap report. `CREATE .. IF NOT
/// EXISTS` statements are labeled by the created object.
fn label_of(sql: &str) -> String {
	let tokens = sql
		.lines()
		.filter(|line| !line.trim_start().starts_with("--"))
		.flat_map(str::split_whitespace)
		.collect::<Vec<_>>();

	for (index, token) in tokens.iter().enumerate() {
		if token.eq_ignore_ascii_case("EXISTS")
			&& let Some(name) = tokens.get(index + 1)
		{
			return name.trim_matches(|ch: char| ch == '"' || ch == '(').to_string();
		}
	}

	tokens.iter().take(3).copied().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn substitutes_vector_dim() {
		let statements = statements(768);
		let memories = statements
			.iter()
			.find(|statement| statement.label == "memories")
			.expect("Expected a memories statement.");

		assert!(memories.sql.contains("VECTOR(768)"));
		assert!(!memories.sql.contains("<VECTOR_DIM>"));
	}

	#[test]
	fn every_statement_is_idempotent() {
		for statement in statements(4) {
			assert!(
				statement.sql.to_ascii_uppercase().contains("IF NOT EXISTS"),
				"Statement {} is not idempotent.",
				statement.label
			);
		}
	}

	#[test]
	fn labels_name_created_objects() {
		let labels =
			statements(4).into_iter().map(|statement| statement.label).collect::<Vec<_>>();

		assert!(labels.contains(&"vector".to_string()));
		assert!(labels.contains(&"pg_trgm".to_string()));
		assert!(labels.contains(&"users".to_string()));
		assert!(labels.contains(&"memories".to_string()));
		assert!(labels.contains(&"reminders".to_string()));
		assert!(labels.contains(&"memories_embedding_idx".to_string()));
		assert!(labels.contains(&"reminders_pending_idx".to_string()));
	}

	#[test]
	fn extensions_apply_before_dependent_objects() {
		let labels =
			statements(4).into_iter().map(|statement| statement.label).collect::<Vec<_>>();
		let vector = labels
			.iter()
			.position(|label| label == "vector")
			.expect("Expected a vector extension statement.");
		let memories = labels
			.iter()
			.position(|label| label == "memories")
			.expect("Expected a memories statement.");

		assert!(vector < memories);
	}
}
