//! HTML rendering.
//!
//! Fragments for learning packs and chat replies, and a self-contained page
//! wrapper with all CSS inlined.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

use vedro_core::model::{ChatReply, ExperimentExplanation, LearningPack};

use crate::markdown::markdown_to_html;

/// Escape a string for safe HTML insertion.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Render a learning pack as an `<article>` fragment.
pub fn learning_pack_html(pack: &LearningPack) -> String {
    let mut html = String::new();
    html.push_str("<article class=\"learning-pack\">\n");

    html.push_str("<section class=\"summary\">\n<h2>Simple Summary</h2>\n");
    html.push_str(&format!("<p>{}</p>\n", html_escape(pack.simple_summary.trim())));
    html.push_str("</section>\n");

    if !pack.key_learning_points.is_empty() {
        html.push_str("<section class=\"key-points\">\n<h2>Key Learning Points</h2>\n<ul>\n");
        for point in &pack.key_learning_points {
            html.push_str(&format!(
                "<li><strong>{}</strong>: {}</li>\n",
                html_escape(point.title.trim()),
                html_escape(point.description.trim())
            ));
        }
        html.push_str("</ul>\n</section>\n");
    }

    if !pack.step_by_step_explanation.is_empty() {
        html.push_str("<section class=\"steps\">\n<h2>Step-by-Step Explanation</h2>\n<ol>\n");
        for step in &pack.step_by_step_explanation {
            html.push_str(&format!("<li>{}</li>\n", html_escape(step.trim())));
        }
        html.push_str("</ol>\n</section>\n");
    }

    if !pack.cause_and_effect.is_empty() {
        html.push_str("<section class=\"cause-effect\">\n<h2>Cause &amp; Effect</h2>\n");
        html.push_str("<table>\n<thead><tr><th>Cause</th><th>Effect</th></tr></thead>\n<tbody>\n");
        for pair in &pack.cause_and_effect {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                html_escape(pair.cause.trim()),
                html_escape(pair.effect.trim())
            ));
        }
        html.push_str("</tbody></table>\n</section>\n");
    }

    if !pack.quiz_questions.is_empty() {
        html.push_str("<section class=\"quiz\">\n<h2>Mini Quiz</h2>\n<ol>\n");
        for q in &pack.quiz_questions {
            html.push_str(&format!("<li>\n<p>{}</p>\n", html_escape(q.question.trim())));
            html.push_str("<ol type=\"A\">\n");
            for option in &q.options {
                html.push_str(&format!("<li>{}</li>\n", html_escape(option.trim())));
            }
            html.push_str("</ol>\n");
            html.push_str(&format!(
                "<details><summary>Answer</summary>{}</details>\n</li>\n",
                html_escape(q.correct_answer.trim())
            ));
        }
        html.push_str("</ol>\n</section>\n");
    }

    html.push_str("</article>\n");
    html
}

/// Render a chat reply as an HTML fragment.
pub fn chat_reply_html(reply: &ChatReply) -> String {
    match reply {
        ChatReply::SimpleReply(simple) => format!(
            "<div class=\"reply\">\n{}</div>\n",
            markdown_to_html(&simple.reply)
        ),
        ChatReply::LearningPack(pack) => learning_pack_html(pack),
    }
}

/// Render an experiment explanation (Markdown from the model) as a fragment.
pub fn explanation_html(explanation: &ExperimentExplanation) -> String {
    format!(
        "<div class=\"explanation\">\n{}</div>\n",
        markdown_to_html(&explanation.explanation)
    )
}

/// Wrap a fragment in a standalone HTML document.
pub fn page(title: &str, body: &str, generated_at: DateTime<Utc>) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>Vedro AI: {}</title>\n", html_escape(title)));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(title)));
    html.push_str(&format!(
        "<p class=\"meta\">Generated by Vedro AI | {}</p>\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n<main>\n");
    html.push_str(body);
    html.push_str("</main>\n</body>\n</html>");
    html
}

/// Write a rendered document to a file, creating parent directories.
pub fn write_document(document: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, document).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fdfaf3; --fg: #2b2118; --accent: #8a5a2b; --border: #e6dccb; --panel: #f6efe1; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #1c1712; --fg: #f3ece0; --accent: #d9a55b; --border: #3d3227; --panel: #2a221a; }
}
body { font-family: Georgia, 'Iowan Old Style', serif; margin: 0; padding: 2rem; max-width: 52rem; background: var(--bg); color: var(--fg); line-height: 1.6; }
h1, h2 { color: var(--accent); }
h2 { margin-top: 2rem; border-bottom: 1px solid var(--border); }
.meta { color: #8b7d6b; font-size: 0.9rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--panel); }
.quiz > ol > li { margin-bottom: 1rem; padding: 0.75rem 1rem; background: var(--panel); border-radius: 8px; }
pre { overflow-x: auto; padding: 1rem; background: var(--panel); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin-top: 0.5rem; }
summary { cursor: pointer; font-weight: bold; }
"#;
