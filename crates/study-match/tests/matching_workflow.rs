//! Integration specifications for the study-partner matching workflow.
//!
//! Scenarios drive the public service facade and HTTP router end to end: a student signs in,
//! edits a profile, browses ranked candidates, and opens a chat once interest is mutual.

mod common {
    use std::sync::Arc;
    use std::time::Duration;

    use study_match::config::MatchingConfig;
    use study_match::matching::{
        LearningStyle, MatchingService, MemoryStore, PreferredSchedule, ProfileUpdate, Uid,
    };

    pub(super) type Service = MatchingService<MemoryStore, MemoryStore, MemoryStore>;

    pub(super) fn uid(value: &str) -> Uid {
        Uid::new(value)
    }

    pub(super) fn build_service() -> (Arc<Service>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let config = MatchingConfig {
            store_timeout: Duration::from_millis(250),
            ..MatchingConfig::default()
        };
        let service = MatchingService::new(store.clone(), store.clone(), store.clone(), config);
        (Arc::new(service), store)
    }

    pub(super) fn update(
        name: &str,
        major: &str,
        subjects: &[&str],
        schedule: PreferredSchedule,
        style: LearningStyle,
    ) -> ProfileUpdate {
        ProfileUpdate {
            name: name.to_string(),
            major: major.to_string(),
            years_of_study: "2".to_string(),
            description: String::new(),
            current_subjects: subjects.iter().map(|code| code.to_string()).collect(),
            preferred_schedule: Some(schedule),
            learning_style: Some(style),
            avatar_image: None,
        }
    }

    /// Run first sessions and profile edits for a small cohort.
    pub(super) async fn enroll_cohort(service: &Service) {
        let cohort = [
            update(
                "Ana",
                "Computer Science",
                &["CS101", "MATH200"],
                PreferredSchedule::WeekdayEarlyEvening,
                LearningStyle::Visual,
            ),
            update(
                "Ben",
                "computer science ",
                &["CS101", "MATH200"],
                PreferredSchedule::WeekdayEarlyEvening,
                LearningStyle::Visual,
            ),
            update(
                "Cleo",
                "History",
                &["HIST110"],
                PreferredSchedule::WeekendMorning,
                LearningStyle::Auditory,
            ),
            update(
                "Dev",
                "Physics",
                &["MATH200", "PHYS150"],
                PreferredSchedule::WeekdayEarlyEvening,
                LearningStyle::Kinesthetic,
            ),
        ];

        for profile in cohort {
            let id = uid(&profile.name.to_lowercase());
            service.start_session(&id).await.expect("first session");
            service
                .profiles()
                .update_profile(&id, profile)
                .await
                .expect("profile saved");
        }
    }
}

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use common::*;
use study_match::matching::{matching_router, score, MatchError, NewMessage, PairState, ThreadId};

#[tokio::test]
async fn ranked_matches_put_the_closest_peer_first() {
    let (service, _) = build_service();
    enroll_cohort(&service).await;

    let matches = service
        .top_matches(&uid("ana"), None)
        .await
        .expect("matches for ana");

    let order: Vec<&str> = matches.iter().map(|m| m.profile.name.as_str()).collect();
    assert_eq!(order, vec!["Ben", "Dev", "Cleo"]);
    assert_eq!(matches[0].match_percent, 100);
    // Half the subjects, plus schedule and year.
    assert_eq!(matches[1].match_percent, 50);
    assert_eq!(matches[2].match_percent, 5);

    let ana = service.profiles().get_profile(&uid("ana")).await.expect("ana");
    for candidate in &matches {
        assert_eq!(candidate.match_percent, score(&candidate.profile, &ana));
    }
}

#[tokio::test]
async fn mutual_interest_unlocks_chat_and_hides_both_users() {
    let (service, store) = build_service();
    enroll_cohort(&service).await;

    let first = service
        .connect(&uid("ana"), &uid("ben"))
        .await
        .expect("ana likes ben");
    assert!(!first.matched);
    assert!(matches!(
        service.chat().open_thread(&uid("ben"), "ana").await,
        Err(MatchError::InvalidState(_))
    ));

    let second = service
        .connect(&uid("ben"), &uid("ana"))
        .await
        .expect("ben likes ana");
    assert!(second.matched);
    assert_eq!(second.thread_id, Some(ThreadId("ana_ben".to_string())));
    assert_eq!(store.thread_count(), 1);
    assert_eq!(
        service
            .ledger()
            .pair_state(&uid("ben"), &uid("ana"))
            .await
            .expect("state"),
        PairState::Matched
    );

    service
        .chat()
        .post_message(
            &uid("ben"),
            "ana",
            NewMessage {
                text: "Library after class?".to_string(),
                attachments: Vec::new(),
            },
        )
        .await
        .expect("message posted");
    let view = service
        .chat()
        .open_thread(&uid("ana"), "ana_ben")
        .await
        .expect("ana opens the thread");
    assert_eq!(view.messages.len(), 1);

    for (viewer, hidden) in [("ana", "ben"), ("ben", "ana")] {
        let matches = service
            .top_matches(&uid(viewer), Some(10))
            .await
            .expect("matches");
        assert!(matches.iter().all(|m| m.profile.uid != uid(hidden)));
    }
}

#[tokio::test]
async fn deleting_an_account_clears_matches_for_the_partner() {
    let (service, store) = build_service();
    enroll_cohort(&service).await;
    service.connect(&uid("ana"), &uid("dev")).await.expect("like");
    service.connect(&uid("dev"), &uid("ana")).await.expect("like back");

    service
        .profiles()
        .delete_account(&uid("ana"))
        .await
        .expect("account deleted");

    assert_eq!(store.like_count(), 0);
    assert_eq!(store.thread_count(), 0);
    let threads = service.chat().threads_for(&uid("dev")).await.expect("threads");
    assert!(threads.is_empty());
    let matches = service.top_matches(&uid("dev"), None).await.expect("matches");
    assert!(matches.iter().all(|m| m.profile.uid != uid("ana")));
}

#[tokio::test]
async fn http_session_and_matches_round_trip() {
    let (service, _) = build_service();
    enroll_cohort(&service).await;
    let router = matching_router(service);

    let session = router
        .clone()
        .oneshot(
            Request::post("/api/v1/sessions/erin")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("session handled");
    assert_eq!(session.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::get("/api/v1/matches/erin?count=2")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("matches handled");
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body");
    let payload: Value = serde_json::from_slice(&body).expect("json");
    let candidates = payload.as_array().expect("array of candidates");
    assert_eq!(candidates.len(), 2);
    assert!(candidates
        .iter()
        .all(|candidate| candidate["matchPercent"] == Value::from(0)));
}
