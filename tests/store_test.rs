//! Integration tests for the SQLite-backed case store.
//!
//! Uses an in-memory database; exercises the CRUD surface, the scoped stage
//! and chat mutators, and the one-time legacy-history conversion.

use pretty_assertions::assert_eq;
use serde_json::json;

use legal_case_analysis::store::{AnalysisStage, Case, CaseStore, ChatMessage, SqliteStore};

/// Create an in-memory store instance for testing
async fn create_test_store() -> SqliteStore {
    SqliteStore::new_in_memory()
        .await
        .expect("Failed to create in-memory store")
}

fn case_with_id(id: &str, name: &str) -> Case {
    let mut case = Case::new(name);
    case.id = id.to_string();
    case
}

#[cfg(test)]
mod api_key_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_missing_key_reads_as_empty() {
        let store = create_test_store().await;
        assert_eq!(store.load_api_key().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_save_and_load_key() {
        let store = create_test_store().await;
        store.save_api_key("AIza-test-key").await.unwrap();
        assert_eq!(store.load_api_key().await.unwrap(), "AIza-test-key");
    }

    #[tokio::test]
    async fn test_save_overwrites_unconditionally() {
        let store = create_test_store().await;
        store.save_api_key("first").await.unwrap();
        store.save_api_key("second").await.unwrap();
        assert_eq!(store.load_api_key().await.unwrap(), "second");
    }
}

#[cfg(test)]
mod case_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_empty_store_reads_as_empty_collection() {
        let store = create_test_store().await;
        assert!(store.get_all_cases().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_case_prepends() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "first")).await.unwrap();
        store.add_case(&case_with_id("c2", "second")).await.unwrap();

        let cases = store.get_all_cases().await.unwrap();
        let ids: Vec<&str> = cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1"], "most recently created comes first");
    }

    #[tokio::test]
    async fn test_resave_is_idempotent() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "first")).await.unwrap();
        store.add_case(&case_with_id("c2", "second")).await.unwrap();

        let original = store.get_all_cases().await.unwrap();
        store.save_all_cases(&original).await.unwrap();
        store
            .save_all_cases(&store.get_all_cases().await.unwrap())
            .await
            .unwrap();

        assert_eq!(store.get_all_cases().await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_delete_after_add_restores_collection() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "first")).await.unwrap();
        store.add_case(&case_with_id("c2", "second")).await.unwrap();
        let before = store.get_all_cases().await.unwrap();

        store.add_case(&case_with_id("c3", "transient")).await.unwrap();
        store.delete_case("c3").await.unwrap();

        assert_eq!(store.get_all_cases().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_case_replaces_by_id() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "old name")).await.unwrap();

        let mut updated = store.get_case("c1").await.unwrap().unwrap();
        updated.name = "new name".to_string();
        store.update_case(&updated).await.unwrap();

        assert_eq!(
            store.get_case("c1").await.unwrap().unwrap().name,
            "new name"
        );
    }

    #[tokio::test]
    async fn test_update_unknown_case_is_noop() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "kept")).await.unwrap();
        let before = store.get_all_cases().await.unwrap();

        store
            .update_case(&case_with_id("ghost", "nobody"))
            .await
            .unwrap();

        assert_eq!(store.get_all_cases().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_unknown_case_is_noop() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "kept")).await.unwrap();
        store.delete_case("ghost").await.unwrap();
        assert_eq!(store.get_all_cases().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_all_cases_keeps_api_key() {
        let store = create_test_store().await;
        store.save_api_key("survivor").await.unwrap();
        store.add_case(&case_with_id("c1", "doomed")).await.unwrap();

        store.clear_all_cases().await.unwrap();

        assert!(store.get_all_cases().await.unwrap().is_empty());
        assert_eq!(store.load_api_key().await.unwrap(), "survivor");
    }
}

#[cfg(test)]
mod stage_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_end_to_end_add_case_then_stage() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "X")).await.unwrap();

        let stage = AnalysisStage::new(0, "Stage 1", "input text", "analysis output");
        store.add_stage_to_case("c1", &stage).await.unwrap();

        let cases = store.get_all_cases().await.unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "X");
        assert_eq!(cases[0].stages, vec![stage]);
    }

    #[tokio::test]
    async fn test_stages_keep_insertion_order() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "X")).await.unwrap();

        for i in 0..3 {
            let stage = AnalysisStage::new(i, format!("Stage {}", i + 1), "in", "out");
            store.add_stage_to_case("c1", &stage).await.unwrap();
        }

        let case = store.get_case("c1").await.unwrap().unwrap();
        let indexes: Vec<i32> = case.stages.iter().map(|s| s.stage_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_add_stage_to_unknown_case_is_noop() {
        let store = create_test_store().await;
        let stage = AnalysisStage::new(0, "Stage 1", "in", "out");
        store.add_stage_to_case("ghost", &stage).await.unwrap();
        assert!(store.get_all_cases().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_stage_in_case() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "X")).await.unwrap();
        let mut stage = AnalysisStage::new(0, "Stage 1", "in", "out");
        store.add_stage_to_case("c1", &stage).await.unwrap();

        stage.output = "revised".to_string();
        store.update_stage_in_case("c1", &stage).await.unwrap();

        let case = store.get_case("c1").await.unwrap().unwrap();
        assert_eq!(case.stages[0].output, "revised");
    }

    #[tokio::test]
    async fn test_delete_stage_from_case() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "X")).await.unwrap();
        let stage = AnalysisStage::new(0, "Stage 1", "in", "out");
        store.add_stage_to_case("c1", &stage).await.unwrap();

        store.delete_stage_from_case("c1", &stage.id).await.unwrap();

        let case = store.get_case("c1").await.unwrap().unwrap();
        assert!(case.stages.is_empty());
    }

    #[tokio::test]
    async fn test_add_chat_to_case() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "X")).await.unwrap();

        let chat = ChatMessage::new("what now?", "appeal within 30 days");
        store.add_chat_to_case("c1", &chat).await.unwrap();

        let case = store.get_case("c1").await.unwrap().unwrap();
        assert_eq!(case.chats, vec![chat]);
    }
}

#[cfg(test)]
mod legacy_migration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn legacy_payload() -> String {
        json!([
            {
                "id": "h1",
                "stageIndex": 0,
                "stage": "Stage 1: Identifying the legal issue",
                "input": "the tenant stopped paying rent in March",
                "output": "issue analysis",
                "date": "2024-03-01T10:00:00Z"
            },
            {
                "id": "h2",
                "stageIndex": 2,
                "stage": "Stage 3: Analyzing the legal texts",
                "input": "contract clause seven is ambiguous",
                "output": "texts analysis",
                "date": "2024-03-02T10:00:00Z"
            }
        ])
        .to_string()
    }

    #[tokio::test]
    async fn test_legacy_history_converts_to_single_stage_cases() {
        let store = create_test_store().await;
        // No cases key exists yet, so the legacy key is picked up.
        store.seed_legacy_history(&legacy_payload()).await.unwrap();
        store.migrate_legacy_history().await.unwrap();

        let cases = store.get_all_cases().await.unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id, "h1");
        assert_eq!(cases[0].name, "the tenant stopped paying rent...");
        assert_eq!(cases[0].stages.len(), 1);
        assert_eq!(cases[0].stages[0].output, "issue analysis");

        assert!(
            !store.has_legacy_history().await.unwrap(),
            "legacy key is deleted after conversion"
        );
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() {
        let store = create_test_store().await;
        store.seed_legacy_history(&legacy_payload()).await.unwrap();
        store.migrate_legacy_history().await.unwrap();
        let after_first = store.get_all_cases().await.unwrap();

        store.migrate_legacy_history().await.unwrap();
        assert_eq!(store.get_all_cases().await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_migration_skipped_once_cases_exist() {
        let store = create_test_store().await;
        store.add_case(&case_with_id("c1", "existing")).await.unwrap();
        store.seed_legacy_history(&legacy_payload()).await.unwrap();

        store.migrate_legacy_history().await.unwrap();

        let cases = store.get_all_cases().await.unwrap();
        assert_eq!(cases.len(), 1, "legacy data is not merged into live data");
        assert!(store.has_legacy_history().await.unwrap());
    }
}
