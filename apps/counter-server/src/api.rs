//! JSON API over arbitrary named counters.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{CoreError, Counter, CounterDatabase, CounterName};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::action::CounterAction;
use crate::AppState;

#[derive(Serialize)]
struct CounterOut {
    name: String,
    value: i64,
    created_at: String,
    updated_at: String,
}

#[derive(Serialize)]
struct ValueOut {
    name: String,
    value: i64,
}

fn counter_to_out(counter: Counter) -> CounterOut {
    CounterOut {
        name: counter.name.as_str().to_string(),
        value: counter.value,
        created_at: http_common::system_time_to_rfc3339(counter.created_at),
        updated_at: http_common::system_time_to_rfc3339(counter.updated_at),
    }
}

fn error_response(err: &CoreError) -> Response {
    match err {
        CoreError::InvalidName(msg) => (
            StatusCode::BAD_REQUEST,
            Json(http_common::json_error_with_message(
                "invalid_name",
                &format!("invalid counter name: {}", msg),
            )),
        )
            .into_response(),
        CoreError::Overflow => (
            StatusCode::CONFLICT,
            Json(http_common::json_err("overflow")),
        )
            .into_response(),
        CoreError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(http_common::json_err("not_found")),
        )
            .into_response(),
        CoreError::AlreadyExists | CoreError::Storage(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(http_common::json_error_with_message(
                "internal",
                &err.to_string(),
            )),
        )
            .into_response(),
    }
}

pub(crate) async fn get_counter<D: CounterDatabase + 'static>(
    State(state): State<AppState<D>>,
    Path(name): Path<String>,
) -> Response {
    let name = match CounterName::new(name) {
        Ok(n) => n,
        Err(e) => {
            warn!(err = %e, "bad counter name in path");
            return error_response(&e);
        }
    };
    let loaded = state
        .db
        .session()
        .and_then(|session| state.store.get_or_create(&session, &name));
    match loaded {
        Ok(counter) => (StatusCode::OK, Json(counter_to_out(counter))).into_response(),
        Err(e) => {
            error!(name = %name, err = %e, "get counter error");
            error_response(&e)
        }
    }
}

pub(crate) async fn apply_action<D: CounterDatabase + 'static>(
    State(state): State<AppState<D>>,
    Path((name, action)): Path<(String, CounterAction)>,
) -> Response {
    let name = match CounterName::new(name) {
        Ok(n) => n,
        Err(e) => {
            warn!(err = %e, "bad counter name in path");
            return error_response(&e);
        }
    };
    let result = state
        .db
        .session()
        .and_then(|session| action.apply(&state.store, &session, &name));
    match result {
        Ok(value) => {
            info!(name = %name, action = action.as_str(), value, "api action ok");
            (
                StatusCode::OK,
                Json(ValueOut {
                    name: name.as_str().to_string(),
                    value,
                }),
            )
                .into_response()
        }
        Err(CoreError::Overflow) => {
            warn!(name = %name, action = action.as_str(), "counter would overflow");
            error_response(&CoreError::Overflow)
        }
        Err(e) => {
            error!(name = %name, action = action.as_str(), err = %e, "api action error");
            error_response(&e)
        }
    }
}

pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use crate::test_support;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use domain::{Clock, CounterName, CounterRepository, SystemClock};

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn json(body: &str) -> serde_json::Value {
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn get_creates_named_counter() {
        let (app, _db) = test_support::memory_app();
        let (status, body) = test_support::get(&app, "/api/counters/visits").await;
        assert_eq!(status, StatusCode::OK);
        let v = json(&body);
        assert_eq!(v["name"], "visits");
        assert_eq!(v["value"], 0);
        assert!(v["created_at"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn actions_on_named_counters_are_independent() {
        let (app, _db) = test_support::memory_app();
        for uri in [
            "/api/counters/Test/increment",
            "/api/counters/test/increment",
            "/api/counters/TEST/increment",
        ] {
            let (status, body) = test_support::send(&app, post(uri)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json(&body)["value"], 1);
        }
        let (_, body) = test_support::send(&app, post("/api/counters/test/decrement")).await;
        assert_eq!(json(&body)["value"], 0);
        let (_, body) = test_support::get(&app, "/api/counters/Test").await;
        assert_eq!(json(&body)["value"], 1);
    }

    #[tokio::test]
    async fn reset_returns_zero() {
        let (app, db) = test_support::memory_app();
        let n = CounterName::new("big").unwrap();
        db.insert(&n, 999_999, SystemClock.now()).unwrap();

        let (_, body) = test_support::send(&app, post("/api/counters/big/increment")).await;
        assert_eq!(json(&body)["value"], 1_000_000);
        let (status, body) = test_support::send(&app, post("/api/counters/big/reset")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), serde_json::json!({"name": "big", "value": 0}));
    }

    #[tokio::test]
    async fn overflow_maps_to_conflict() {
        let (app, db) = test_support::memory_app();
        db.insert(&CounterName::new("max").unwrap(), i64::MAX, SystemClock.now())
            .unwrap();
        let (status, body) = test_support::send(&app, post("/api/counters/max/increment")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json(&body)["error"]["code"], "overflow");
    }

    #[tokio::test]
    async fn too_long_name_is_bad_request() {
        let (app, _db) = test_support::memory_app();
        let uri = format!("/api/counters/{}", "a".repeat(101));
        let (status, body) = test_support::get(&app, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["error"]["code"], "invalid_name");
    }

    #[tokio::test]
    async fn storage_failure_is_internal_error() {
        let app = test_support::unavailable_app();
        let (status, body) = test_support::send(&app, post("/api/counters/x/increment")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let v = json(&body);
        assert_eq!(v["error"]["code"], "internal");
        assert_eq!(v["error"]["message"], "storage error: database is locked");
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let (app, _db) = test_support::memory_app();
        let (status, body) = test_support::get(&app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "ok");
    }
}
