//! Server-rendered pages: an index of the apps and one single-page UI per app
//! that drives the session API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};

use crate::apps::AppKind;
use crate::core::errors::ApiError;
use crate::state::AppState;

const APP_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>__TITLE__</title>
<style>
  body { font-family: sans-serif; background: #fafafa; margin: 0; }
  .container { max-width: 600px; margin: 0 auto; padding: 2rem; }
  .subtitle { margin-top: 0.5rem; color: #666; }
  input { width: 100%; box-sizing: border-box; margin-top: 1rem; padding: 0.5rem; border: 1px solid #eaeaef; border-radius: 8px; }
  .output { position: relative; margin-top: 1rem; padding: 1rem; border: 1px solid #eaeaef; border-radius: 8px; white-space: pre-wrap; }
  .output-label { position: absolute; top: -0.5rem; background: white; padding: 0 0.1rem; color: #aeaeaf; font-size: 0.7rem; font-weight: bold; text-transform: uppercase; letter-spacing: 0.05rem; }
  button { margin-top: 1rem; padding: 0.5rem 1rem; }
  .messages { margin-top: 2rem; display: flex; flex-direction: column; gap: 1rem; }
  .message { background: #f5f5f5; padding: 1rem; border-radius: 8px; }
  .text-box { background: #fff; padding: 1rem; border-radius: 8px; white-space: pre-wrap; }
  .arrow { color: #666; text-align: center; }
  .meta { font-size: 0.8rem; color: #666; }
  .error { color: #b00020; }
</style>
</head>
<body>
<div class="container">
  <div style="font-size: 2rem">__TITLE__</div>
  <div class="subtitle">__SUBTITLE__</div>
  <input id="text" placeholder="__PLACEHOLDER__">
  <div class="output"><span class="output-label">Output</span><div id="output">Answer will appear here.</div></div>
  <button id="post">Post</button>
  <div id="messages" class="messages"></div>
</div>
<script>
const base = "/api/apps/__SLUG__/sessions";

async function call(method, url, body) {
  const res = await fetch(url, {
    method,
    headers: body ? { "Content-Type": "application/json" } : {},
    body: body ? JSON.stringify(body) : undefined,
  });
  const data = await res.json();
  if (!res.ok) throw new Error(data.error || res.statusText);
  return data;
}

function showError(err) {
  const output = document.getElementById("output");
  output.className = "error";
  output.textContent = err.message;
}

function render(messages) {
  const list = document.getElementById("messages");
  list.replaceChildren(...messages.map((m) => {
    const box = document.createElement("div");
    box.className = "message";
    const question = document.createElement("div");
    question.className = "text-box";
    question.textContent = m.question_text;
    const arrow = document.createElement("div");
    arrow.className = "arrow";
    arrow.textContent = "↓";
    const answer = document.createElement("div");
    answer.className = "text-box";
    answer.textContent = m.answer_text;
    const meta = document.createElement("div");
    meta.className = "meta";
    meta.textContent = (m.to_lang ? m.to_lang : "") + " · " + m.created_at;
    box.append(question, arrow, answer, meta);
    return box;
  }));
}

async function refreshOutput() {
  const output = document.getElementById("output");
  output.className = "";
  output.textContent = "…";
  try {
    const data = await call("GET", await sessionUrl("output"));
    output.textContent = data.output;
  } catch (err) {
    showError(err);
  }
}

document.getElementById("text").addEventListener("blur", async (event) => {
  try {
    await call("PUT", await sessionUrl("text"), { text: event.target.value });
    await refreshOutput();
  } catch (err) {
    showError(err);
  }
});

document.getElementById("post").addEventListener("click", async () => {
  try {
    const data = await call("POST", await sessionUrl("post"));
    render(data.messages);
  } catch (err) {
    showError(err);
  }
});

const session = call("POST", base).then((data) => data.session.id);
session.catch(showError);

// Handlers may fire before the session exists; they wait for its id.
async function sessionUrl(path) {
  return `${base}/${await session}/${path}`;
}
</script>
</body>
</html>
"#;

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let items: String = state
        .apps
        .kinds()
        .into_iter()
        .map(|kind| {
            format!(
                "<li><a href=\"/apps/{}\">{}</a> &middot; {}</li>",
                kind.slug(),
                escape_html(kind.title()),
                escape_html(kind.subtitle())
            )
        })
        .collect();
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Apps</title></head>\
         <body style=\"font-family: sans-serif; max-width: 600px; margin: 2rem auto\">\
         <h1>Apps</h1><ul>{}</ul></body></html>",
        items
    ))
}

pub async fn app_page(
    State(state): State<Arc<AppState>>,
    Path(app): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: AppKind = app.parse()?;
    state.apps.get(kind)?;
    Ok(Html(render_app_page(kind)))
}

pub fn render_app_page(kind: AppKind) -> String {
    APP_PAGE
        .replace("__TITLE__", &escape_html(kind.title()))
        .replace("__SUBTITLE__", &escape_html(kind.subtitle()))
        .replace("__PLACEHOLDER__", &escape_html(kind.input_placeholder()))
        .replace("__SLUG__", kind.slug())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_page_is_filled_for_each_app() {
        for kind in AppKind::ALL {
            let page = render_app_page(kind);
            assert!(!page.contains("__"));
            assert!(page.contains(&format!("/api/apps/{}/sessions", kind.slug())));
        }
        assert!(render_app_page(AppKind::Translator).contains("Text to translate"));
    }

    #[test]
    fn requests_wait_for_the_session_id() {
        let page = render_app_page(AppKind::HelperBot);
        assert!(!page.contains("sessionId"));
        assert!(!page.contains("/null/"));
        for path in ["output", "text", "post"] {
            assert!(page.contains(&format!("await sessionUrl(\"{}\")", path)));
        }
    }
}
