//! Server-rendered HTML pages.
//!
//! The counter page posts each button as a plain form to
//! `/counter/:action`; the response is the same page re-rendered with the
//! value returned by the store and a notification. The last value shown to
//! the user travels in the hidden `shown` field so a failed action can keep
//! displaying it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Form,
};
use domain::{CounterDatabase, CounterName};
use http_common::html_escape;
use serde::Deserialize;
use tracing::{error, info};

use crate::action::{CounterAction, Notice, NoticeKind};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ActionForm {
    #[serde(default)]
    shown: Option<String>,
}

pub async fn index() -> Html<String> {
    Html(render_index_page())
}

pub(crate) async fn counter_page<D: CounterDatabase + 'static>(
    State(state): State<AppState<D>>,
) -> impl IntoResponse {
    let loaded = state
        .db
        .session()
        .and_then(|session| state.store.get_or_create(&session, &state.page_counter));
    match loaded {
        Ok(counter) => {
            info!(name = %counter.name, value = counter.value, "counter loaded");
            (
                StatusCode::OK,
                Html(render_counter_page(&state.page_counter, Some(counter.value), None)),
            )
        }
        Err(e) => {
            error!(name = %state.page_counter, err = %e, "Error loading counter");
            let notice = Notice {
                kind: NoticeKind::Negative,
                message: format!("Error loading counter: {}", e),
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_counter_page(&state.page_counter, None, Some(&notice))),
            )
        }
    }
}

pub(crate) async fn counter_action<D: CounterDatabase + 'static>(
    State(state): State<AppState<D>>,
    Path(action): Path<CounterAction>,
    Form(form): Form<ActionForm>,
) -> impl IntoResponse {
    let result = state
        .db
        .session()
        .and_then(|session| action.apply(&state.store, &session, &state.page_counter));
    match result {
        Ok(value) => {
            info!(name = %state.page_counter, action = action.as_str(), value, "counter updated");
            let notice = action.success_notice();
            (
                StatusCode::OK,
                Html(render_counter_page(&state.page_counter, Some(value), Some(&notice))),
            )
        }
        Err(e) => {
            let notice = action.failure_notice(&e);
            error!(name = %state.page_counter, action = action.as_str(), err = %e, "{}", notice.message);
            let shown = form.shown.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_counter_page(&state.page_counter, shown, Some(&notice))),
            )
        }
    }
}

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #eff6ff 0%, #e0e7ff 100%);
            min-height: 100vh;
            display: flex;
            flex-direction: column;
            align-items: center;
            justify-content: center;
            padding: 32px;
        }
        h1 { font-size: 2.25rem; color: #1f2937; margin-bottom: 32px; }
        .card {
            background: white;
            border-radius: 16px;
            box-shadow: 0 20px 25px -5px rgba(0,0,0,0.1);
            padding: 32px;
            min-width: 320px;
            text-align: center;
        }
        .value { font-family: monospace; font-size: 3.75rem; font-weight: bold; color: #2563eb; margin-bottom: 32px; }
        .buttons { display: flex; gap: 16px; justify-content: center; }
        .buttons form { display: inline; }
        button { border: none; color: white; font-weight: bold; cursor: pointer; box-shadow: 0 4px 6px rgba(0,0,0,0.1); }
        .round { width: 64px; height: 64px; font-size: 1.5rem; border-radius: 9999px; }
        .dec { background: #ef4444; }
        .inc { background: #22c55e; }
        .reset { background: #6b7280; padding: 12px 24px; border-radius: 8px; height: 64px; }
        .caption { margin-top: 16px; font-size: 0.875rem; color: #6b7280; }
        .link { display: inline-block; background: #2563eb; color: white; padding: 12px 24px; border-radius: 8px; font-weight: 600; text-decoration: none; }
        .hint { font-size: 1.125rem; color: #4b5563; margin-bottom: 16px; }
        .notify { position: fixed; bottom: 24px; padding: 12px 20px; border-radius: 8px; color: white; }
        .notify-positive { background: #10b981; }
        .notify-info { background: #3b82f6; }
        .notify-warning { background: #f59e0b; }
        .notify-negative { background: #ef4444; }
"#;

fn render_index_page() -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Counter App</title>
    <style>{style}</style>
</head>
<body>
    <h1>Welcome to Counter App</h1>
    <div class="card">
        <p class="hint">Click below to access the counter application</p>
        <a class="link" href="/counter">Open Counter</a>
    </div>
</body>
</html>"##,
        style = STYLE,
    )
}

fn render_notice(notice: &Notice) -> String {
    let timeout_attr = notice
        .kind
        .timeout_ms()
        .map(|ms| format!(r#" data-timeout="{}""#, ms))
        .unwrap_or_default();
    format!(
        r#"<div class="notify notify-{kind}" role="status"{timeout}>{message}</div>
    <script>
        document.querySelectorAll('.notify[data-timeout]').forEach(function (el) {{
            setTimeout(function () {{ el.remove(); }}, Number(el.dataset.timeout));
        }});
    </script>"#,
        kind = notice.kind.as_str(),
        timeout = timeout_attr,
        message = html_escape(&notice.message),
    )
}

/// Render the counter page. `value` is `None` when nothing could be loaded.
fn render_counter_page(name: &CounterName, value: Option<i64>, notice: Option<&Notice>) -> String {
    let shown = value.map(|v| v.to_string()).unwrap_or_default();
    let display = value.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string());
    let button = |action: CounterAction, class: &str, label: &str| {
        format!(
            r#"<form method="post" action="/counter/{action}"><input type="hidden" name="shown" value="{shown}"><button type="submit" class="{class}">{label}</button></form>"#,
            action = action.as_str(),
            shown = shown,
            class = class,
            label = label,
        )
    };
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Counter Application</title>
    <style>{style}</style>
</head>
<body>
    <h1>Counter Application</h1>
    <div class="card">
        <div class="value" id="counter-value">{display}</div>
        <div class="buttons">
            {dec}
            {reset}
            {inc}
        </div>
        <p class="caption">Counter: {name}</p>
    </div>
    {notice}
</body>
</html>"##,
        style = STYLE,
        display = display,
        dec = button(CounterAction::Decrement, "round dec", "-"),
        reset = button(CounterAction::Reset, "reset", "Reset"),
        inc = button(CounterAction::Increment, "round inc", "+"),
        name = html_escape(name.as_str()),
        notice = notice.map(render_notice).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use axum::http::StatusCode;
    use domain::{Clock, CounterRepository, SystemClock};

    fn displayed_value(html: &str) -> &str {
        let start = html
            .find(r#"id="counter-value">"#)
            .expect("value element")
            + r#"id="counter-value">"#.len();
        let end = start + html[start..].find('<').expect("closing tag");
        &html[start..end]
    }

    #[tokio::test]
    async fn index_links_to_counter() {
        let (app, _db) = test_support::memory_app();
        let (status, body) = test_support::get(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Welcome to Counter App"));
        assert!(body.contains(r#"<a class="link" href="/counter">Open Counter</a>"#));
    }

    #[tokio::test]
    async fn counter_page_loads_with_buttons() {
        let (app, db) = test_support::memory_app();
        let (status, body) = test_support::get(&app, "/counter").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Counter Application"));
        assert_eq!(displayed_value(&body), "0");
        for label in [">+</button>", ">-</button>", ">Reset</button>"] {
            assert!(body.contains(label), "missing {label}");
        }
        assert!(body.contains("Counter: default"));
        // Loading the page creates the default counter
        assert!(db.find(&CounterName::default()).unwrap().is_some());
    }

    #[tokio::test]
    async fn end_to_end_click_sequence() {
        let (app, _db) = test_support::memory_app();

        let (_, body) = test_support::get(&app, "/counter").await;
        assert_eq!(displayed_value(&body), "0");

        let (status, body) = test_support::post_form(&app, "/counter/increment", "shown=0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(displayed_value(&body), "1");
        assert!(body.contains("Counter incremented!"));
        assert!(body.contains("notify-positive"));

        let (_, body) = test_support::post_form(&app, "/counter/decrement", "shown=1").await;
        assert_eq!(displayed_value(&body), "0");
        assert!(body.contains("Counter decremented!"));
        let (_, body) = test_support::post_form(&app, "/counter/decrement", "shown=0").await;
        assert_eq!(displayed_value(&body), "-1");

        let (_, body) = test_support::post_form(&app, "/counter/reset", "shown=-1").await;
        assert_eq!(displayed_value(&body), "0");
        assert!(body.contains("Counter reset to 0!"));
        assert!(body.contains(r#"data-timeout="1000""#));
    }

    #[tokio::test]
    async fn value_persists_across_reloads() {
        let (app, _db) = test_support::memory_app();
        for _ in 0..3 {
            test_support::post_form(&app, "/counter/increment", "").await;
        }
        let (_, body) = test_support::get(&app, "/counter").await;
        assert_eq!(displayed_value(&body), "3");
    }

    #[tokio::test]
    async fn page_starts_from_existing_value() {
        let (app, db) = test_support::memory_app();
        db.insert(&CounterName::default(), -10, SystemClock.now()).unwrap();

        let (_, body) = test_support::get(&app, "/counter").await;
        assert_eq!(displayed_value(&body), "-10");
        let (_, body) = test_support::post_form(&app, "/counter/increment", "shown=-10").await;
        assert_eq!(displayed_value(&body), "-9");
        let (_, body) = test_support::post_form(&app, "/counter/decrement", "shown=-9").await;
        assert_eq!(displayed_value(&body), "-10");
    }

    #[tokio::test]
    async fn failure_keeps_last_shown_value() {
        let app = test_support::unavailable_app();
        let (status, body) = test_support::post_form(&app, "/counter/increment", "shown=41").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(displayed_value(&body), "41");
        assert!(body.contains("Error incrementing counter: storage error: database is locked"));
        assert!(body.contains("notify-negative"));
        assert!(!body.contains(r#"notify-negative" role="status" data-timeout"#));
    }

    #[tokio::test]
    async fn failed_load_shows_placeholder() {
        let app = test_support::unavailable_app();
        let (status, body) = test_support::get(&app, "/counter").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(displayed_value(&body), "?");
        assert!(body.contains("Error loading counter"));
    }

    #[tokio::test]
    async fn unknown_action_is_rejected() {
        let (app, _db) = test_support::memory_app();
        let (status, _) = test_support::post_form(&app, "/counter/explode", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn counter_name_is_escaped() {
        let name = CounterName::new("<b>").unwrap();
        let html = render_counter_page(&name, Some(1), None);
        assert!(html.contains("Counter: &lt;b&gt;"));
    }
}
