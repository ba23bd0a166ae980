//! Markdown output and Markdown → HTML conversion.
//!
//! Conversion is CommonMark with tables and strikethrough. Single newlines
//! inside a paragraph become `<br />`. Raw HTML in the input is escaped as
//! text, and `javascript:`, `vbscript:` and `data:` link targets become `#`.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use vedro_core::model::{ChatReply, LearningPack};

const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Render a learning pack as Markdown. Empty sections are omitted, so the
/// fallback pack renders as its summary alone.
pub fn learning_pack_markdown(pack: &LearningPack) -> String {
    let mut md = String::new();

    md.push_str("## Simple Summary\n\n");
    md.push_str(pack.simple_summary.trim());
    md.push_str("\n\n");

    if !pack.key_learning_points.is_empty() {
        md.push_str("## Key Learning Points\n\n");
        for point in &pack.key_learning_points {
            md.push_str(&format!(
                "- **{}**: {}\n",
                point.title.trim(),
                point.description.trim()
            ));
        }
        md.push('\n');
    }

    if !pack.step_by_step_explanation.is_empty() {
        md.push_str("## Step-by-Step Explanation\n\n");
        for (i, step) in pack.step_by_step_explanation.iter().enumerate() {
            md.push_str(&format!("{}. {}\n", i + 1, step.trim()));
        }
        md.push('\n');
    }

    if !pack.cause_and_effect.is_empty() {
        md.push_str("## Cause & Effect\n\n");
        for pair in &pack.cause_and_effect {
            md.push_str(&format!(
                "- **{}** → {}\n",
                pair.cause.trim(),
                pair.effect.trim()
            ));
        }
        md.push('\n');
    }

    if !pack.quiz_questions.is_empty() {
        md.push_str("## Mini Quiz\n\n");
        let mut key = Vec::new();
        for (i, q) in pack.quiz_questions.iter().enumerate() {
            md.push_str(&format!("**{}. {}**\n\n", i + 1, q.question.trim()));
            for (letter, option) in OPTION_LETTERS.iter().zip(&q.options) {
                md.push_str(&format!("- {letter}. {}\n", option.trim()));
                if option == &q.correct_answer {
                    key.push(format!("{}. {letter}", i + 1));
                }
            }
            md.push('\n');
        }
        if !key.is_empty() {
            md.push_str(&format!("*Answer key: {}*\n", key.join(", ")));
        }
    }

    md.trim_end().to_string()
}

/// Render a chat reply as Markdown.
pub fn chat_reply_markdown(reply: &ChatReply) -> String {
    match reply {
        ChatReply::SimpleReply(simple) => simple.reply.trim().to_string(),
        ChatReply::LearningPack(pack) => learning_pack_markdown(pack),
    }
}

/// Link schemes that never survive into rendered output.
const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

fn is_blocked_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    BLOCKED_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

fn neutralize(dest_url: CowStr<'_>) -> CowStr<'_> {
    if is_blocked_url(&dest_url) {
        CowStr::Borrowed("#")
    } else {
        dest_url
    }
}

/// Convert Markdown to an HTML fragment.
pub fn markdown_to_html(md: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let events = Parser::new_ext(md, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::SoftBreak => Event::HardBreak,
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: neutralize(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: neutralize(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(md.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_pack;

    #[test]
    fn pack_markdown_has_all_sections_in_order() {
        let md = learning_pack_markdown(&sample_pack());
        let order = [
            "## Simple Summary",
            "## Key Learning Points",
            "## Step-by-Step Explanation",
            "## Cause & Effect",
            "## Mini Quiz",
        ];
        let positions: Vec<usize> = order.iter().map(|h| md.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(md.contains("- **Light**: Sunlight powers the reaction."));
        assert!(md.contains("2. Water is split."));
        assert!(md.contains("- B. Oxygen"));
        assert!(md.ends_with("*Answer key: 1. B*"));
    }

    #[test]
    fn fallback_pack_is_summary_only() {
        let md = learning_pack_markdown(&LearningPack::fallback("volcanoes"));
        assert!(md.starts_with("## Simple Summary"));
        assert!(md.contains("volcanoes"));
        assert!(!md.contains("## Mini Quiz"));
    }

    #[test]
    fn simple_reply_is_plain_text() {
        let reply = ChatReply::simple("  Hi! What would you like to learn about today? ");
        assert_eq!(
            chat_reply_markdown(&reply),
            "Hi! What would you like to learn about today?"
        );
    }

    #[test]
    fn converts_block_structure() {
        let md = "# Title\n\nFirst line\nsecond line\n\n- one\n- two\n\n1. alpha\n2. beta";
        let html = markdown_to_html(md);
        assert_eq!(
            html,
            "<h1>Title</h1>\n\
             <p>First line<br />\nsecond line</p>\n\
             <ul>\n<li>one</li>\n<li>two</li>\n</ul>\n\
             <ol>\n<li>alpha</li>\n<li>beta</li>\n</ol>\n"
        );
    }

    #[test]
    fn nested_lists_and_code() {
        let html = markdown_to_html("- outer\n  - inner\n\n```rust\nlet x = a < b;\n```");
        assert!(html.contains("<li>outer\n<ul>\n<li>inner</li>\n</ul>\n</li>"));
        assert!(html.contains("<pre><code class=\"language-rust\">let x = a &lt; b;\n</code></pre>"));
    }

    #[test]
    fn links_and_tables() {
        let html = markdown_to_html("See [NASA](https://nasa.gov).\n\n| gas | share |\n|-----|-------|\n| N2 | 78% |");
        assert!(html.contains("<a href=\"https://nasa.gov\">NASA</a>"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>gas</th>"));
        assert!(html.contains("<td>78%</td>"));
    }

    #[test]
    fn inline_formatting() {
        assert_eq!(
            markdown_to_html("**H₂O** is *wet* and `a<b`"),
            "<p><strong>H₂O</strong> is <em>wet</em> and <code>a&lt;b</code></p>\n"
        );
        assert_eq!(markdown_to_html("2 * 3 = 6"), "<p>2 * 3 = 6</p>\n");
    }

    #[test]
    fn raw_html_is_escaped() {
        let block = markdown_to_html("<script>alert(1)</script>");
        assert!(block.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!block.contains("<script"));

        let inline = markdown_to_html("click <img src=x onerror=alert(1)> here");
        assert!(inline.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(!inline.contains("<img"));
    }

    #[test]
    fn script_links_are_neutralized() {
        let html = markdown_to_html("[click](javascript:alert(1)) and ![x](JavaScript:alert(2))");
        assert!(!html.to_ascii_lowercase().contains("javascript:"));
        assert!(html.contains("<a href=\"#\">click</a>"));
    }

    #[test]
    fn headings_need_a_space() {
        assert_eq!(markdown_to_html("#hashtag"), "<p>#hashtag</p>\n");
        assert_eq!(markdown_to_html("### Deep ###"), "<h3>Deep</h3>\n");
        assert_eq!(markdown_to_html("####### seven"), "<p>####### seven</p>\n");
    }
}
