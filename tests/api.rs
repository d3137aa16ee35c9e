use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use parsons_backend::config::EngineConfig;
use parsons_backend::routes::build_router;
use parsons_backend::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    build_router(Arc::new(AppState::from_config(EngineConfig::default())))
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .expect("request");
    let res = app.oneshot(req).await.expect("response");
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json") };
    (status, value)
}

#[tokio::test]
async fn health() {
    let (status, body) = call(app(), "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn problems_are_listed_and_served_scrambled() {
    let (status, body) = call(app(), "GET", "/api/v1/problems", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().map_or(false, |a| a.iter().any(|p| p["id"] == "count-evens")));

    let (status, body) = call(app(), "GET", "/api/v1/problems/count-evens", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["initialArrangement"]["scrap"].as_array().map(|s| s.len()), Some(8));
    assert_eq!(body["problem"]["options"]["canIndent"], true);

    let (status, body) = call(app(), "GET", "/api/v1/problems/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().map_or(false, |e| e.contains("nope")));
}

#[tokio::test]
async fn validate_a_text_submission() {
    let solution = json!([
        "def is_adult(age):",
        "    if age >= 18:",
        "        return True",
        "    return False",
    ]);
    let (status, body) =
        call(app(), "POST", "/api/v1/validate", Some(json!({ "problemId": "is-adult", "solution": solution }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["passed"], true);
    assert_eq!(body["score"], 100.0);
    assert_eq!(body["summary"], "Correct solution!");
    assert_eq!(body["rulesApplied"], json!(["completeness", "ordering", "indentation"]));
}

#[tokio::test]
async fn validate_rejects_double_placement() {
    let arrangement = json!({
        "solution": [{ "blockId": "block-0", "indent": 0 }],
        "scrap": ["block-0"],
    });
    let (status, body) =
        call(app(), "POST", "/api/v1/validate", Some(json!({ "problemId": "is-adult", "arrangement": arrangement }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().map_or(false, |e| e.contains("block-0")));
}

#[tokio::test]
async fn validate_an_inline_problem_with_legacy_options() {
    let problem = json!({
        "blocks": [
            { "id": "a", "lines": [{ "text": "x = 1", "indent": 0 }] },
            { "id": "b", "lines": [{ "text": "print(x)", "indent": 0 }] },
        ],
        "options": { "can_indent": false, "grader": "ParsonsWidget._graders.LineBasedGrader", "unknown": 1 },
    });
    let arrangement = json!({ "solution": [{ "blockId": "b" }, { "blockId": "a" }], "scrap": [] });
    let (status, body) =
        call(app(), "POST", "/api/v1/validate", Some(json!({ "problem": problem, "arrangement": arrangement }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["passed"], false);
    assert_eq!(body["errors"][0]["kind"], "misplaced-block");
}

#[tokio::test]
async fn attempt_then_adapt() {
    let (status, body) = call(
        app(),
        "POST",
        "/api/v1/attempt",
        Some(json!({ "state": { "attempts": 2, "incorrectAttempts": 2 }, "correct": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["incorrectAttempts"], 3);
    assert_eq!(body["shouldAdapt"], true);

    let (status, body) = call(
        app(),
        "POST",
        "/api/v1/adapt",
        Some(json!({
            "problemId": "average",
            "state": body["state"],
            "arrangement": { "solution": [{ "blockId": "block-7", "indent": 1 }], "scrap": [] },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["applied"], json!(["identify_pairs", "remove_distractors"]));
    assert_eq!(body["newState"]["distractorsRemoved"], 1);
    // The placed loop variant survives; the return variant is gone.
    assert_eq!(body["arrangement"]["solution"][0]["blockId"], "block-7");
}

#[tokio::test]
async fn moving_a_variant_in_evicts_its_sibling() {
    let problem = json!({
        "blocks": [
            { "id": "a", "lines": [{ "text": "for i in range(3):", "indent": 0 }], "groupId": "g" },
            { "id": "b", "lines": [{ "text": "print(i)", "indent": 1 }] },
            { "id": "c", "lines": [{ "text": "for i in range(3)", "indent": 0 }], "groupId": "g", "isDistractor": true, "isPairedDistractor": true },
        ],
    });
    let (status, body) = call(
        app(),
        "POST",
        "/api/v1/arrangement/move",
        Some(json!({
            "problem": problem,
            "arrangement": { "solution": [{ "blockId": "a" }], "scrap": ["b", "c"] },
            "blockId": "c",
            "to": "solution",
            "position": 0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["arrangement"]["solution"], json!([{ "blockId": "c", "indent": 0 }]));
    assert_eq!(body["arrangement"]["scrap"], json!(["b", "a"]));
    assert_eq!(body["evicted"][0]["blockId"], "a");
}

#[tokio::test]
async fn generate_stores_the_problem() {
    let (status, body) = call(
        app(),
        "POST",
        "/api/v1/problems/generate",
        Some(json!({ "sourceCode": "if x == 1:\n    y = 2", "distractors": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "generated");
    let blocks = body["problem"]["blocks"].as_array().map(|b| b.len());
    assert_eq!(blocks, Some(4));

    let (status, _) = call(app(), "POST", "/api/v1/problems/generate", Some(json!({ "sourceCode": "   " }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn indentation_hints_for_a_flat_loop() {
    let arrangement = json!({
        "solution": [
            { "blockId": "block-0", "indent": 0 },
            { "blockId": "block-1", "indent": 0 },
            { "blockId": "block-2", "indent": 0 },
            { "blockId": "block-3", "indent": 0 },
        ],
        "scrap": [],
    });
    let (status, body) = call(
        app(),
        "POST",
        "/api/v1/hints/indentation",
        Some(json!({ "problemId": "print-coordinates", "arrangement": arrangement })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issues"].as_array().map(|i| i.len()), Some(3));
    assert_eq!(body["issues"][0]["direction"], "indent-more");
}

#[tokio::test]
async fn deleting_a_problem_removes_it_from_the_bank() {
    let app = app();
    let (status, body) = call(app.clone(), "DELETE", "/api/v1/problems/count-evens", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "count-evens");

    let (status, _) = call(app.clone(), "GET", "/api/v1/problems/count-evens", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = call(app.clone(), "GET", "/api/v1/problems", None).await;
    assert!(body.as_array().map_or(false, |a| a.iter().all(|p| p["id"] != "count-evens")));

    let (status, _) = call(app, "DELETE", "/api/v1/problems/count-evens", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
