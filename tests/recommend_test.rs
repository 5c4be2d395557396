//! Integration tests for next-activity recommendation:
//! - Heuristic priority over a store-built snapshot
//! - Advisor precedence and silent fallback
//! - Practice suggestions

use async_trait::async_trait;
use learnpath::recommend::{
    family_scores, AdviceError, AdviceProvider, AdviceRequest, AdviceResponse, RecommendationSource, Recommender,
};
use learnpath::{practice_suggestions, recommend, ActivityFamily, CategoryStatUpdate, ProgressStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn store_with_weak_flashcards() -> ProgressStore {
    let store = ProgressStore::in_memory();
    store
        .update_category_stat(ActivityFamily::Flashcards, Some("letters"), CategoryStatUpdate::default().completed(26))
        .await
        .unwrap();
    store
        .update_category_stat(ActivityFamily::Puzzles, None, CategoryStatUpdate::default().completed(9))
        .await
        .unwrap();
    for activity in ["matching", "sorting", "memory"] {
        store
            .update_category_stat(ActivityFamily::Activities, Some(activity), CategoryStatUpdate::default().completed(9))
            .await
            .unwrap();
    }
    store
}

/// Advisor that answers with a fixed activity and counts its calls
struct ScriptedAdvisor {
    answer: Option<&'static str>,
    calls: AtomicUsize,
}

#[async_trait]
impl AdviceProvider for ScriptedAdvisor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn advise(&self, request: &AdviceRequest) -> Result<AdviceResponse, AdviceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(request.recent_history.len() <= 10);
        match self.answer {
            Some(activity) => Ok(AdviceResponse {
                recommended_activity: Some(activity.to_string()),
                reason: Some("Puzzles build logic skills".to_string()),
                ..AdviceResponse::default()
            }),
            None => Err(AdviceError::NotConfigured),
        }
    }
}

#[tokio::test]
async fn test_heuristic_recommends_weak_flashcards() {
    let snapshot = store_with_weak_flashcards().await.load().await;
    let scores = family_scores(&snapshot);
    assert!((scores.avg_flashcard - 0.2).abs() < 1e-9);
    assert_eq!(recommend(&snapshot), ActivityFamily::Flashcards);
}

#[tokio::test]
async fn test_advisor_answer_is_used() {
    let snapshot = store_with_weak_flashcards().await.load().await;
    let advisor = Arc::new(ScriptedAdvisor {
        answer: Some("Shape puzzles"),
        calls: AtomicUsize::new(0),
    });

    let recommender = Recommender::new(Some(advisor.clone()), Duration::from_secs(1));
    let rec = recommender.recommend(&snapshot).await;

    assert_eq!(advisor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(rec.family, ActivityFamily::Puzzles);
    assert_eq!(rec.source, RecommendationSource::Advisor);
    assert_eq!(rec.reason.as_deref(), Some("Puzzles build logic skills"));
}

#[tokio::test]
async fn test_failing_advisor_is_invisible() {
    let snapshot = store_with_weak_flashcards().await.load().await;
    let advisor = Arc::new(ScriptedAdvisor {
        answer: None,
        calls: AtomicUsize::new(0),
    });

    let rec = Recommender::new(Some(advisor), Duration::from_secs(1)).recommend(&snapshot).await;
    assert_eq!(rec.family, ActivityFamily::Flashcards);
    assert_eq!(rec.source, RecommendationSource::Heuristic);
}

#[tokio::test]
async fn test_suggestions_follow_progress() {
    let store = store_with_weak_flashcards().await;
    let hints = practice_suggestions(&store.load().await);
    assert_eq!(hints, vec!["Maintain a daily learning streak"]);
}
