//! Streaming message renderer
//!
//! Groups one message's ordered part sequence into display blocks. The
//! provider emits citation metadata before the text span it supports,
//! so citations buffer until the next text part and attach to it as a
//! new span with footnote numbers that increase across the message.
//! Re-running the renderer over a growing part list during streaming
//! yields a consistent prefix of the final layout.

use crate::conversations::MessagePart;

/// Whether the message's stream is still producing parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Streaming,
    Ready,
}

/// A numbered citation attached to a text span
#[derive(Debug, Clone, PartialEq)]
pub struct Footnote {
    pub number: usize,
    pub url: String,
    pub title: Option<String>,
}

/// A run of text with the citations that support it
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub citations: Vec<Footnote>,
}

/// One entry in the aggregated source summary
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub url: String,
    pub title: Option<String>,
}

/// A renderable block of one message
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayBlock {
    /// Contiguous text content, possibly citation-annotated
    Content { spans: Vec<TextSpan> },
    /// A reasoning trace, collapsed by the UI
    Reasoning { text: String, streaming: bool },
}

/// The rendered form of one message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedMessage {
    pub blocks: Vec<DisplayBlock>,
    /// Web-search results, aggregated independently of inline citations
    pub sources: Vec<Source>,
    /// Names of server-side tools the model used
    pub tool_uses: Vec<String>,
}

/// Render one message's parts into display blocks
///
/// `is_final_message` and `status` control the streaming flag: a
/// trailing reasoning block of the last message shows as actively
/// streaming until the turn settles.
pub fn render_message(
    parts: &[MessagePart],
    is_final_message: bool,
    status: StreamStatus,
) -> RenderedMessage {
    let mut rendered = RenderedMessage::default();
    let mut pending: Vec<(String, Option<String>)> = Vec::new();
    let mut footnote_counter = 0usize;
    let mut content_open = false;

    for part in parts {
        match part {
            MessagePart::Citation { url, title } => {
                pending.push((url.clone(), title.clone()));
            }
            MessagePart::Text { text } => {
                if !content_open {
                    rendered.blocks.push(DisplayBlock::Content { spans: Vec::new() });
                    content_open = true;
                }
                let Some(DisplayBlock::Content { spans }) = rendered.blocks.last_mut() else {
                    continue;
                };

                if pending.is_empty() {
                    // Plain continuation: extend the current span.
                    match spans.last_mut() {
                        Some(span) => span.text.push_str(text),
                        None => spans.push(TextSpan {
                            text: text.clone(),
                            citations: Vec::new(),
                        }),
                    }
                } else {
                    let citations = pending
                        .drain(..)
                        .map(|(url, title)| {
                            footnote_counter += 1;
                            Footnote {
                                number: footnote_counter,
                                url,
                                title,
                            }
                        })
                        .collect();
                    spans.push(TextSpan {
                        text: text.clone(),
                        citations,
                    });
                }
            }
            MessagePart::Reasoning { text } => {
                content_open = false;
                rendered.blocks.push(DisplayBlock::Reasoning {
                    text: text.clone(),
                    streaming: false,
                });
            }
            MessagePart::SourceUrl { url, title } => {
                rendered.sources.push(Source {
                    url: url.clone(),
                    title: title.clone(),
                });
            }
            MessagePart::ToolUse { name } => {
                rendered.tool_uses.push(name.clone());
            }
        }
    }

    // Citations left in `pending` had no following text; they attach to
    // no span.

    if is_final_message && status == StreamStatus::Streaming {
        if let Some(DisplayBlock::Reasoning { streaming, .. }) = rendered.blocks.last_mut() {
            *streaming = true;
        }
    }

    rendered
}
