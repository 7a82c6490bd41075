// src/render.rs

//! Markdown to HTML rendering.
//!
//! Rendering is a pure transform of document bytes to artifact bytes. The
//! [`PageRenderer`] decorator adds the fixed page shell used when the output
//! is viewed in a browser.

use crate::highlight::Highlighter;
use crate::page;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::sync::Arc;

/// Converts a source document into an artifact.
///
/// Implementations must be deterministic: the same input yields byte-identical
/// output. The debouncer never runs two renders at once.
pub trait Render: Send + Sync + 'static {
    fn render(&self, document: &[u8]) -> Vec<u8>;
}

/// Renders markdown with `pulldown-cmark`, passing fenced code blocks through
/// a [`Highlighter`].
#[derive(Clone)]
pub struct MarkdownRenderer {
    highlighter: Arc<dyn Highlighter>,
}

impl MarkdownRenderer {
    pub fn new(highlighter: Arc<dyn Highlighter>) -> Self {
        Self { highlighter }
    }

    fn options() -> Options {
        let mut opts = Options::empty();
        opts.insert(Options::ENABLE_TABLES);
        opts.insert(Options::ENABLE_STRIKETHROUGH);
        opts.insert(Options::ENABLE_FOOTNOTES);
        opts.insert(Options::ENABLE_TASKLISTS);
        opts
    }
}

impl Render for MarkdownRenderer {
    fn render(&self, document: &[u8]) -> Vec<u8> {
        let source = String::from_utf8_lossy(document);
        let parser = Parser::new_ext(&source, Self::options());

        // Replace each code block (start, text..., end) with one HTML event.
        let mut events: Vec<Event> = Vec::new();
        let mut code: Option<(String, String)> = None;
        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .unwrap_or_default()
                            .to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    code = Some((language, String::new()));
                }
                Event::Text(text) if code.is_some() => {
                    if let Some((_, body)) = code.as_mut() {
                        body.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((language, body)) = code.take() {
                        let markup = self.highlighter.highlight(&body, &language);
                        events.push(Event::Html(CowStr::from(markup)));
                    }
                }
                other => events.push(other),
            }
        }

        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out.into_bytes()
    }
}

/// Wraps another renderer's output in the page shell.
pub struct PageRenderer<R> {
    inner: R,
}

impl<R: Render> PageRenderer<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Render> Render for PageRenderer<R> {
    fn render(&self, document: &[u8]) -> Vec<u8> {
        page::wrap(&self.inner.render(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::PlainText;

    fn renderer() -> MarkdownRenderer {
        MarkdownRenderer::new(Arc::new(PlainText))
    }

    #[test]
    fn renders_heading() {
        let out = String::from_utf8(renderer().render(b"# Hi")).unwrap();
        assert!(out.contains("<h1>Hi</h1>"), "got {out}");
    }

    #[test]
    fn rendering_is_idempotent() {
        let doc = b"# Title\n\nSome *text* and a table:\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n```rust\nfn main() {}\n```\n";
        let r = renderer();
        assert_eq!(r.render(doc), r.render(doc));
    }

    #[test]
    fn code_blocks_go_through_highlighter() {
        let out = String::from_utf8(renderer().render(b"```html\n<b>x</b>\n```\n")).unwrap();
        assert!(out.contains("<div class=\"highlight\"><pre>&lt;b&gt;x&lt;/b&gt;\n</pre></div>"), "got {out}");
        assert!(!out.contains("<code"));
    }

    #[test]
    fn page_renderer_wraps_body() {
        let out = String::from_utf8(PageRenderer::new(renderer()).render(b"# Hi")).unwrap();
        assert!(out.starts_with(page::HTML_HEADER));
        assert!(out.ends_with(page::HTML_FOOTER));
        assert!(out.contains("<h1>Hi</h1>"));
    }
}
