#![allow(clippy::unwrap_used)]
// Integration tests for `ChangeWorkflow`: preview, apply, revert, history.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netdiag_core::{
    ApplyStatus, ChangeWorkflow, ClientConfig, CoreError, LoginCredentials, MemorySessionStore,
    RevertOutcome, RiskLevel, SessionManager,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn logged_in() -> (MockServer, SessionManager) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok" })))
        .mount(&server)
        .await;

    let config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    let session = SessionManager::new(&config, Arc::new(MemorySessionStore::new())).unwrap();
    session
        .login(LoginCredentials {
            host: "https://192.168.1.1".into(),
            username: "admin".into(),
            password: SecretString::from("secret".to_owned()),
            site: None,
        })
        .await
        .unwrap();
    (server, session)
}

async fn mount_apply(server: &MockServer, dry_run: bool, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/repair/apply"))
        .and(query_param("job_id", "job-1"))
        .and(body_json(json!({ "recommendation_ids": [0, 1], "dry_run": dry_run })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn applied_pair() -> serde_json::Value {
    json!({
        "results": [
            { "recommendation_index": 0, "change_id": 501, "status": "applied" },
            { "recommendation_index": 1, "status": "failed", "error": "AP offline" }
        ]
    })
}

// ── Preview ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_preview_labels_settings() {
    let (server, session) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/api/repair/preview"))
        .and(query_param("job_id", "job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "previews": [
                {
                    "index": 0,
                    "device_name": "Lobby AP",
                    "action": "change_channel",
                    "current_value": 6,
                    "new_value": 11,
                    "impact": { "risk_level": "low" }
                },
                {
                    "index": 1,
                    "action": "custom_tweak",
                    "impact": { "reason": "Reduce airtime", "risk_level": "high" }
                }
            ]
        })))
        .mount(&server)
        .await;

    let previews = ChangeWorkflow::new(&session)
        .preview("job-1", &[0, 1])
        .await
        .unwrap();

    assert_eq!(previews.len(), 2);
    assert_eq!(previews[0].setting, "Channel");
    assert_eq!(previews[0].description, "Change Channel on Lobby AP");
    assert_eq!(previews[0].current_value, json!(6));
    assert_eq!(previews[0].proposed_value, json!(11));
    assert_eq!(previews[0].risk, RiskLevel::Low);
    assert_eq!(previews[1].setting, "custom_tweak");
    assert_eq!(previews[1].description, "Reduce airtime");
    assert_eq!(previews[1].risk, RiskLevel::High);
}

#[tokio::test]
async fn test_preview_requires_session() {
    let server = MockServer::start().await;
    let config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    let session = SessionManager::new(&config, Arc::new(MemorySessionStore::new())).unwrap();

    let err = ChangeWorkflow::new(&session)
        .preview("job-1", &[0])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAuthenticated));
}

// ── Apply ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_apply_reports_partial_failure() {
    let (server, session) = logged_in().await;
    mount_apply(&server, false, applied_pair()).await;

    let outcome = ChangeWorkflow::new(&session)
        .apply("job-1", &[0, 1], false)
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 2);
    let ok = &outcome.results[0];
    assert_eq!(ok.change_id, "501");
    assert_eq!(ok.status, ApplyStatus::Applied);
    assert!(ok.can_revert());

    let failed = &outcome.results[1];
    assert_eq!(failed.status, ApplyStatus::Failed);
    assert_eq!(failed.change_id, "job-1:1");
    assert_eq!(failed.error.as_deref(), Some("AP offline"));
    assert!(!failed.can_revert());

    // Summary derived from rows when the service omits one.
    assert_eq!(outcome.summary.applied, 1);
    assert_eq!(outcome.summary.failed, 1);
    assert_eq!(outcome.summary.skipped, 0);
    assert!(!outcome.summary.dry_run);
}

#[tokio::test]
async fn test_service_summary_wins() {
    let (server, session) = logged_in().await;
    let mut body = applied_pair();
    body["summary"] = json!({ "applied": 5, "failed": 0, "skipped": 2 });
    mount_apply(&server, false, body).await;

    let outcome = ChangeWorkflow::new(&session)
        .apply("job-1", &[0, 1], false)
        .await
        .unwrap();

    assert_eq!(outcome.summary.applied, 5);
    assert_eq!(outcome.summary.failed, 0);
    assert_eq!(outcome.summary.skipped, 2);
}

#[tokio::test]
async fn test_three_changes_with_one_failure() {
    let (server, session) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/api/repair/apply"))
        .and(body_json(json!({ "recommendation_ids": [0, 1, 2], "dry_run": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "recommendation_index": 0, "change_id": "c-0", "status": "applied" },
                { "recommendation_index": 1, "status": "failed", "error": "AP offline" },
                { "recommendation_index": 2, "change_id": "c-2", "status": "applied" }
            ]
        })))
        .mount(&server)
        .await;

    let outcome = ChangeWorkflow::new(&session)
        .apply("job-1", &[0, 1, 2], false)
        .await
        .unwrap();

    assert_eq!(outcome.summary.applied, 2);
    assert_eq!(outcome.summary.failed, 1);
    assert_eq!(outcome.summary.skipped, 0);
    let revertible: Vec<&str> = outcome
        .results
        .iter()
        .filter(|c| c.can_revert())
        .map(|c| c.change_id.as_str())
        .collect();
    assert_eq!(revertible, vec!["c-0", "c-2"]);
}

#[tokio::test]
async fn test_apply_tolerates_loose_result_rows() {
    let (server, session) = logged_in().await;
    mount_apply(
        &server,
        false,
        json!({
            "results": [
                { "recommendation_index": "0", "change_id": 700, "status": "applied" },
                {
                    "recommendation_index": 1,
                    "status": null,
                    "error": "AP offline",
                    "message": "apply failed"
                }
            ]
        }),
    )
    .await;
    let workflow = ChangeWorkflow::new(&session);

    let outcome = workflow.apply("job-1", &[0, 1], false).await.unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].change_id, "700");
    assert_eq!(outcome.results[0].recommendation_index, Some(0));
    assert!(outcome.results[0].can_revert());
    assert_eq!(outcome.results[1].status, ApplyStatus::Failed);
    assert_eq!(outcome.results[1].error.as_deref(), Some("AP offline"));
    assert_eq!(workflow.ledger().len(), 2);
}

// ── Revert ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_dry_run_can_never_be_reverted() {
    let (server, session) = logged_in().await;
    mount_apply(
        &server,
        true,
        json!({
            "results": [
                { "recommendation_index": 0, "change_id": "would-be-9", "status": "dry_run" },
                { "recommendation_index": 1, "status": "skipped" }
            ],
            "summary": { "dry_run": true }
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/repair/revert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reverted": true })))
        .expect(0)
        .mount(&server)
        .await;
    let workflow = ChangeWorkflow::new(&session);

    let outcome = workflow.apply("job-1", &[0, 1], true).await.unwrap();
    let dry = &outcome.results[0];
    assert!(dry.dry_run);
    assert_eq!(dry.change_id, "job-1:0:dry-run");
    assert_eq!(dry.real_change_id.as_deref(), Some("would-be-9"));
    assert!(!dry.can_revert());
    assert!(outcome.summary.dry_run);

    let err = workflow.revert("job-1:0:dry-run").await.unwrap_err();
    assert!(matches!(err, CoreError::NotRevertible { .. }), "{err:?}");
    let err = workflow.revert("would-be-9").await.unwrap_err();
    assert!(matches!(err, CoreError::NotRevertible { .. }), "{err:?}");
}

#[tokio::test]
async fn test_dry_run_id_reported_by_service_stays_a_dry_run() {
    let (server, session) = logged_in().await;
    mount_apply(
        &server,
        true,
        json!({
            "results": [
                { "recommendation_index": 0, "change_id": "chg-9", "status": "dry_run" }
            ]
        }),
    )
    .await;
    let listed = json!({ "changes": [ { "change_id": "chg-9", "status": "applied" } ] });
    Mock::given(method("GET"))
        .and(path("/api/repair/revertable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listed.clone()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/repair/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listed))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/repair/revert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reverted": true })))
        .expect(0)
        .mount(&server)
        .await;
    let workflow = ChangeWorkflow::new(&session);
    workflow.apply("job-1", &[0, 1], true).await.unwrap();

    let revertable = workflow.revertable().await.unwrap();
    assert!(revertable.is_empty(), "{revertable:?}");

    let history = workflow.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].dry_run);
    assert!(!history[0].can_revert());

    let err = workflow.revert("chg-9").await.unwrap_err();
    assert!(matches!(err, CoreError::NotRevertible { .. }), "{err:?}");
}

#[tokio::test]
async fn test_second_revert_is_a_no_op() {
    let (server, session) = logged_in().await;
    mount_apply(&server, false, applied_pair()).await;
    Mock::given(method("POST"))
        .and(path("/api/repair/revert"))
        .and(body_json(json!({ "change_id": "501" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reverted": true,
            "change_id": "501"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let workflow = ChangeWorkflow::new(&session);
    workflow.apply("job-1", &[0, 1], false).await.unwrap();

    let first = workflow.revert("501").await.unwrap();
    assert!(matches!(first, RevertOutcome::Reverted(_)));
    assert!(first.change().reverted_at.is_some());

    let second = workflow.revert("501").await.unwrap();
    assert!(matches!(second, RevertOutcome::AlreadyReverted(_)));
    assert_eq!(second.change().reverted_at, first.change().reverted_at);
}

#[tokio::test]
async fn test_reverting_twice_leaves_one_ledger_entry() {
    let (server, session) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/api/repair/apply"))
        .and(body_json(json!({ "recommendation_ids": [4], "dry_run": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [ { "recommendation_index": 4, "change_id": "c-4", "status": "applied" } ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/repair/revert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reverted": true })))
        .expect(1)
        .mount(&server)
        .await;
    let workflow = ChangeWorkflow::new(&session);
    workflow.apply("job-1", &[4], false).await.unwrap();

    workflow.revert("c-4").await.unwrap();
    let second = workflow.revert("c-4").await.unwrap();

    assert!(matches!(second, RevertOutcome::AlreadyReverted(_)));
    let ledger = workflow.ledger();
    assert_eq!(ledger.len(), 1);
    assert!(ledger[0].reverted);
}

#[tokio::test]
async fn test_failed_change_is_not_revertible() {
    let (server, session) = logged_in().await;
    mount_apply(&server, false, applied_pair()).await;
    let workflow = ChangeWorkflow::new(&session);
    workflow.apply("job-1", &[0, 1], false).await.unwrap();

    let err = workflow.revert("job-1:1").await.unwrap_err();
    assert!(matches!(err, CoreError::NotRevertible { .. }));
}

#[tokio::test]
async fn test_declined_revert_leaves_ledger_unchanged() {
    let (server, session) = logged_in().await;
    mount_apply(&server, false, applied_pair()).await;
    Mock::given(method("POST"))
        .and(path("/api/repair/revert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reverted": false,
            "error": "device unreachable"
        })))
        .mount(&server)
        .await;
    let workflow = ChangeWorkflow::new(&session);
    workflow.apply("job-1", &[0, 1], false).await.unwrap();

    let outcome = workflow.revert("501").await.unwrap();

    match &outcome {
        RevertOutcome::Failed(change) => {
            assert_eq!(change.error.as_deref(), Some("device unreachable"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!outcome.is_success());
    let entry = workflow
        .ledger()
        .into_iter()
        .find(|c| c.change_id == "501")
        .unwrap();
    assert!(!entry.reverted);
    assert!(entry.can_revert());
}

#[tokio::test]
async fn test_unknown_change_is_looked_up_then_forwarded() {
    let (server, session) = logged_in().await;
    Mock::given(method("GET"))
        .and(path("/api/repair/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "changes": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/repair/revert"))
        .and(body_json(json!({ "change_id": "77" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reverted": true })))
        .expect(1)
        .mount(&server)
        .await;
    let workflow = ChangeWorkflow::new(&session);

    let outcome = workflow.revert("77").await.unwrap();

    assert!(outcome.is_success());
    assert!(workflow.ledger()[0].reverted);
}

#[tokio::test]
async fn test_remote_reverted_change_is_not_sent_again() {
    let (server, session) = logged_in().await;
    Mock::given(method("GET"))
        .and(path("/api/repair/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "changes": [ { "change_id": "12", "status": "reverted" } ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/repair/revert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reverted": true })))
        .expect(0)
        .mount(&server)
        .await;
    let workflow = ChangeWorkflow::new(&session);

    let outcome = workflow.revert("12").await.unwrap();
    assert!(matches!(outcome, RevertOutcome::AlreadyReverted(_)));
}

// ── History ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_history_merges_with_local_ledger() {
    let (server, session) = logged_in().await;
    mount_apply(&server, false, applied_pair()).await;
    Mock::given(method("GET"))
        .and(path("/api/repair/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "changes": [
                { "change_id": 501, "status": "reverted", "reverted_at": "2026-03-01T10:00:00Z" },
                { "change_id": 400, "status": "applied", "job_id": "job-0" },
                { "status": "applied" }
            ]
        })))
        .mount(&server)
        .await;
    let workflow = ChangeWorkflow::new(&session);
    workflow.apply("job-1", &[0, 1], false).await.unwrap();

    let history = workflow.history().await.unwrap();

    let ids: Vec<&str> = history.iter().map(|c| c.change_id.as_str()).collect();
    assert_eq!(ids, vec!["501", "job-1:1", "400"]);
    // The local entry keeps its job context and gains the remote revert.
    assert_eq!(history[0].job_id.as_deref(), Some("job-1"));
    assert!(history[0].reverted);
    assert_eq!(history[2].job_id.as_deref(), Some("job-0"));
}

#[tokio::test]
async fn test_revertable_filters_local_knowledge() {
    let (server, session) = logged_in().await;
    mount_apply(&server, false, applied_pair()).await;
    Mock::given(method("POST"))
        .and(path("/api/repair/revert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reverted": true })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/repair/revertable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "changes": [
                { "change_id": "501", "status": "applied" },
                { "change_id": "600", "status": "applied" }
            ]
        })))
        .mount(&server)
        .await;
    let workflow = ChangeWorkflow::new(&session);
    workflow.apply("job-1", &[0, 1], false).await.unwrap();
    workflow.revert("501").await.unwrap();

    let revertable = workflow.revertable().await.unwrap();

    let ids: Vec<&str> = revertable.iter().map(|c| c.change_id.as_str()).collect();
    assert_eq!(ids, vec!["600"]);
}
