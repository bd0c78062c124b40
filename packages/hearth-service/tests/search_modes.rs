mod common;

use serde_json::json;
use time::macros::datetime;

use common::*;
use hearth_service::{Error, MemoryFilter, SearchMode, SearchRequest};
use hearth_testkit::TestDatabase;

#[tokio::test]
#[ignore = "Requires external Postgres. Set HEARTH_PG_DSN to run."]
async fn vector_search_orders_by_similarity() {
	let Some(dsn) = hearth_testkit::env_dsn() else {
		eprintln!(
			"Skipping vector_search_orders_by_similarity; set HEARTH_PG_DSN to run this test."
		);

		return;
	};
	let db = TestDatabase::new(&dsn).await.expect("Failed to create the test database.");
	let service = build_service(db.dsn()).await;

	if !service.capabilities.vector {
		eprintln!("Skipping vector_search_orders_by_similarity; pgvector is not installed.");

		return;
	}

	let mut exact = item("ada", "Exact match");
	let mut close = item("ada", "Close match");
	let mut far = item("ada", "Far match");

	exact.embedding = Some(vec![1.0, 0.0, 0.0, 0.0]);
	close.embedding = Some(vec![0.9, 0.1, 0.0, 0.0]);
	far.embedding = Some(vec![0.0, 1.0, 0.0, 0.0]);

	store(&service, exact).await;
	store(&service, close).await;
	store(&service, far).await;
	store(&service, item("ada", "No embedding at all")).await;

	let response = service
		.search(SearchRequest {
			owner_id: Some("ada".to_string()),
			query_embedding: Some(vec![1.0, 0.0, 0.0, 0.0]),
			..Default::default()
		})
		.await
		.expect("Failed to search.");

	assert_eq!(response.meta.mode, SearchMode::Vector);
	assert_eq!(response.results.len(), 3, "Rows without an embedding are excluded.");
	assert_eq!(response.results[0].content, "Exact match");

	let similarities = response
		.results
		.iter()
		.map(|result| result.similarity.expect("Expected a similarity score."))
		.collect::<Vec<_>>();

	assert!((similarities[0] - 1.0).abs() < 1e-6, "Unexpected similarity: {}", similarities[0]);
	assert!(
		similarities.windows(2).all(|pair| pair[0] >= pair[1]),
		"Similarities must be non-increasing: {similarities:?}"
	);

	db.cleanup().await.expect("Failed to drop the test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set HEARTH_PG_DSN to run."]
async fn trigram_search_ranks_similar_text_first() {
	let Some(dsn) = hearth_testkit::env_dsn() else {
		eprintln!(
			"Skipping trigram_search_ranks_similar_text_first; set HEARTH_PG_DSN to run this test."
		);

		return;
	};
	let db = TestDatabase::new(&dsn).await.expect("Failed to create the test database.");
	let service = build_service(db.dsn()).await;

	if !service.capabilities.trigram {
		eprintln!("Skipping trigram_search_ranks_similar_text_first; pg_trgm is not installed.");

		return;
	}

	store(&service, item("ada", "Dinner with Alice at the pasta place")).await;
	store(&service, item("ada", "Car insurance renewal")).await;

	let response = service
		.search(SearchRequest {
			owner_id: Some("ada".to_string()),
			query: Some("pasta dinner".to_string()),
			..Default::default()
		})
		.await
		.expect("Failed to search.");

	assert_eq!(response.meta.mode, SearchMode::Trigram);
	assert_eq!(response.results[0].content, "Dinner with Alice at the pasta place");
	assert!(
		response.results[0].similarity.is_some_and(|similarity| similarity > 0.0),
		"Expected a positive trigram score."
	);

	db.cleanup().await.expect("Failed to drop the test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set HEARTH_PG_DSN to run."]
async fn chronological_orders_newest_first_with_undated_last() {
	let Some(dsn) = hearth_testkit::env_dsn() else {
		eprintln!(
			"Skipping chronological_orders_newest_first_with_undated_last; set HEARTH_PG_DSN to run this test."
		);

		return;
	};
	let db = TestDatabase::new(&dsn).await.expect("Failed to create the test database.");
	let service = build_service(db.dsn()).await;

	// Stored oldest-dated last so insertion order cannot mask the sort.
	store(&service, item("ada", "Undated scribble")).await;
	store(
		&service,
		item_with("ada", "Older entry", json!({}), None, Some(datetime!(2026-02-01 09:00 UTC))),
	)
	.await;
	store(
		&service,
		item_with("ada", "Newer entry", json!({}), None, Some(datetime!(2026-02-02 09:00 UTC))),
	)
	.await;

	let response = service
		.search(SearchRequest { owner_id: Some("ada".to_string()), ..Default::default() })
		.await
		.expect("Failed to search.");
	let contents =
		response.results.iter().map(|result| result.content.as_str()).collect::<Vec<_>>();

	assert_eq!(contents, vec!["Newer entry", "Older entry", "Undated scribble"]);

	db.cleanup().await.expect("Failed to drop the test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set HEARTH_PG_DSN to run."]
async fn query_embedding_dimension_must_match() {
	let Some(dsn) = hearth_testkit::env_dsn() else {
		eprintln!(
			"Skipping query_embedding_dimension_must_match; set HEARTH_PG_DSN to run this test."
		);

		return;
	};
	let db = TestDatabase::new(&dsn).await.expect("Failed to create the test database.");
	let service = build_service(db.dsn()).await;
	let err = service
		.search(SearchRequest {
			owner_id: Some("ada".to_string()),
			query_embedding: Some(vec![0.5, 0.5]),
			..Default::default()
		})
		.await
		.expect_err("Expected a validation error.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err}");
	assert!(err.to_string().contains("dimensions"), "Unexpected error: {err}");

	db.cleanup().await.expect("Failed to drop the test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set HEARTH_PG_DSN to run."]
async fn missing_owner_is_rejected() {
	let Some(dsn) = hearth_testkit::env_dsn() else {
		eprintln!("Skipping missing_owner_is_rejected; set HEARTH_PG_DSN to run this test.");

		return;
	};
	let db = TestDatabase::new(&dsn).await.expect("Failed to create the test database.");
	let service = build_service(db.dsn()).await;
	let err =
		service.search(SearchRequest::default()).await.expect_err("Expected a validation error.");

	assert!(err.to_string().contains("owner_id is required."), "Unexpected error: {err}");

	db.cleanup().await.expect("Failed to drop the test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set HEARTH_PG_DSN to run."]
async fn shared_thread_spans_owners_and_caps_the_limit() {
	let Some(dsn) = hearth_testkit::env_dsn() else {
		eprintln!(
			"Skipping shared_thread_spans_owners_and_caps_the_limit; set HEARTH_PG_DSN to run this test."
		);

		return;
	};
	let db = TestDatabase::new(&dsn).await.expect("Failed to create the test database.");
	let service = build_service(db.dsn()).await;

	store(
		&service,
		item_with("ada", "Pizza Friday?", json!({ "thread_id": "family-chat" }), None, None),
	)
	.await;
	store(
		&service,
		item_with("grace", "Yes please", json!({ "thread_id": "family-chat" }), None, None),
	)
	.await;
	store(&service, item_with("eve", "Unrelated", json!({ "thread_id": "other-chat" }), None, None))
		.await;

	let response = service
		.search(SearchRequest {
			filter: Some(MemoryFilter {
				thread_id: Some("family-chat".to_string()),
				shared_thread: true,
				limit: Some(500),
				..Default::default()
			}),
			..Default::default()
		})
		.await
		.expect("Failed to search.");

	assert_eq!(response.results.len(), 2, "Both participants' messages are visible.");
	assert!(response.meta.shared_thread);
	assert_eq!(response.meta.limit, 30, "Shared-thread reads are capped.");

	// Without shared_thread the same filter stays within one owner.
	let scoped = service
		.search(SearchRequest {
			owner_id: Some("ada".to_string()),
			filter: Some(MemoryFilter {
				thread_id: Some("family-chat".to_string()),
				..Default::default()
			}),
			..Default::default()
		})
		.await
		.expect("Failed to search.");

	assert_eq!(scoped.results.len(), 1);

	db.cleanup().await.expect("Failed to drop the test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set HEARTH_PG_DSN to run."]
async fn filters_narrow_results_and_report_what_applied() {
	let Some(dsn) = hearth_testkit::env_dsn() else {
		eprintln!(
			"Skipping filters_narrow_results_and_report_what_applied; set HEARTH_PG_DSN to run this test."
		);

		return;
	};
	let db = TestDatabase::new(&dsn).await.expect("Failed to create the test database.");
	let service = build_service(db.dsn()).await;

	store(
		&service,
		item_with(
			"ada",
			"Groceries",
			json!({ "type": "expense" }),
			Some(50.0),
			Some(datetime!(2026-03-10 12:00 UTC)),
		),
	)
	.await;
	store(
		&service,
		item_with(
			"ada",
			"Coffee",
			json!({ "type": "expense" }),
			Some(4.0),
			Some(datetime!(2026-03-10 13:00 UTC)),
		),
	)
	.await;
	store(
		&service,
		item_with(
			"ada",
			"Rent",
			json!({ "type": "expense" }),
			Some(900.0),
			Some(datetime!(2026-04-01 08:00 UTC)),
		),
	)
	.await;
	store(
		&service,
		item_with(
			"ada",
			"Diary entry",
			json!({ "type": "note" }),
			None,
			Some(datetime!(2026-03-12 20:00 UTC)),
		),
	)
	.await;

	let response = service
		.search(SearchRequest {
			owner_id: Some("ada".to_string()),
			filter: Some(MemoryFilter {
				memory_type: Some("expense".to_string()),
				date_from: Some(datetime!(2026-03-01 00:00 UTC)),
				date_to: Some(datetime!(2026-03-31 23:59 UTC)),
				min_amount: Some(20.0),
				..Default::default()
			}),
			..Default::default()
		})
		.await
		.expect("Failed to search.");

	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].content, "Groceries");
	assert_eq!(response.meta.applied_filters, vec!["type", "date_from", "date_to", "min_amount"]);

	db.cleanup().await.expect("Failed to drop the test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set HEARTH_PG_DSN to run."]
async fn limit_truncates_results() {
	let Some(dsn) = hearth_testkit::env_dsn() else {
		eprintln!("Skipping limit_truncates_results; set HEARTH_PG_DSN to run this test.");

		return;
	};
	let db = TestDatabase::new(&dsn).await.expect("Failed to create the test database.");
	let service = build_service(db.dsn()).await;

	for index in 0..5 {
		store(&service, item("ada", &format!("Note {index}"))).await;
	}

	let response = service
		.search(SearchRequest {
			owner_id: Some("ada".to_string()),
			filter: Some(MemoryFilter { limit: Some(2), ..Default::default() }),
			..Default::default()
		})
		.await
		.expect("Failed to search.");

	assert_eq!(response.results.len(), 2);
	assert_eq!(response.meta.limit, 2);

	db.cleanup().await.expect("Failed to drop the test database.");
}
