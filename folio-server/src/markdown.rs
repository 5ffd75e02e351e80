use pulldown_cmark::{html, Options, Parser};

/// Turns post markdown into HTML that is safe to embed in a page.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// CommonMark (plus tables, strikethrough, task lists) through an
/// allow-list HTML sanitizer. Raw HTML in the source survives only where
/// the sanitizer permits it.
#[derive(Debug, Clone)]
pub struct SanitizingRenderer {
    options: Options,
}

impl Default for SanitizingRenderer {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl SanitizingRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkdownRenderer for SanitizingRenderer {
    fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut unsafe_html = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut unsafe_html, parser);
        ammonia::clean(&unsafe_html)
    }
}
