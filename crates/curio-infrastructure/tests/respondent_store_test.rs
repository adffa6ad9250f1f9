//! File-backed respondent state as the resolver uses it across visits.

use curio_core::session::SurveyId;
use curio_core::state::{RespondentStore, completed_key, is_flag_set, respondent_key};
use curio_infrastructure::{FileRespondentStore, InMemoryRespondentStore};
use tempfile::TempDir;

#[tokio::test]
async fn test_identifier_and_flag_survive_a_new_visit() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("respondent_state.json");
    let survey = SurveyId(7);

    {
        let store = FileRespondentStore::open(path.clone()).await.unwrap();
        store
            .set(&respondent_key(survey), "anonymous_0123")
            .await
            .unwrap();
        store.set(&completed_key(survey), "true").await.unwrap();
    }

    let store = FileRespondentStore::open(path).await.unwrap();
    assert_eq!(
        store.get(&respondent_key(survey)).await.unwrap().as_deref(),
        Some("anonymous_0123")
    );
    let flag = store.get(&completed_key(survey)).await.unwrap();
    assert!(is_flag_set(flag.as_deref()));

    // Other surveys are untouched
    assert_eq!(store.get(&respondent_key(SurveyId(8))).await.unwrap(), None);
}

#[tokio::test]
async fn test_state_file_is_plain_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("respondent_state.json");

    let store = FileRespondentStore::open(path.clone()).await.unwrap();
    store.set("survey_1_respondent", "anon_abc").await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["survey_1_respondent"], "anon_abc");
}

#[tokio::test]
async fn test_two_handles_keep_each_others_keys() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("respondent_state.json");

    let first = FileRespondentStore::open(path.clone()).await.unwrap();
    let second = FileRespondentStore::open(path.clone()).await.unwrap();
    first
        .set(&respondent_key(SurveyId(1)), "anon_a")
        .await
        .unwrap();
    second
        .set(&respondent_key(SurveyId(2)), "anon_b")
        .await
        .unwrap();

    // The second write picked up the first handle's key
    assert_eq!(
        second.get(&respondent_key(SurveyId(1))).await.unwrap().as_deref(),
        Some("anon_a")
    );

    let reopened = FileRespondentStore::open(path).await.unwrap();
    assert_eq!(
        reopened.get(&respondent_key(SurveyId(1))).await.unwrap().as_deref(),
        Some("anon_a")
    );
    assert_eq!(
        reopened.get(&respondent_key(SurveyId(2))).await.unwrap().as_deref(),
        Some("anon_b")
    );
}

#[tokio::test]
async fn test_memory_store_matches_file_store_semantics() {
    let store = InMemoryRespondentStore::new();
    assert_eq!(store.get("k").await.unwrap(), None);
    store.set("k", "v").await.unwrap();
    store.set("k", "w").await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("w"));
}
