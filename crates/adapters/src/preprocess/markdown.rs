//! Markdown to HTML rendering via pulldown-cmark

use blog_bridge_domain::MarkdownRenderer;
use pulldown_cmark::{Options, Parser, html};

/// GFM-flavoured renderer (tables, strikethrough, task lists)
#[derive(Debug, Clone)]
pub struct PulldownRenderer {
    options: Options,
}

impl PulldownRenderer {
    pub fn new(gfm: bool) -> Self {
        let mut options = Options::empty();
        if gfm {
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_STRIKETHROUGH);
            options.insert(Options::ENABLE_TASKLISTS);
        }
        Self { options }
    }
}

impl Default for PulldownRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MarkdownRenderer for PulldownRenderer {
    fn render_to_html(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}
