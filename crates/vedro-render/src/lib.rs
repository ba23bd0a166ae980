//! vedro-render: Markdown and HTML presentation of tutor output.

pub mod html;
pub mod markdown;

pub use html::{
    chat_reply_html, explanation_html, html_escape, learning_pack_html, page, write_document,
};
pub use markdown::{chat_reply_markdown, learning_pack_markdown, markdown_to_html};
