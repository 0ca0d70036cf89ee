use pulldown_cmark::{Event, Options, Parser, html};

/// Text in, markup out. Must not fail and must not have side effects.
pub trait MarkdownRenderer {
	fn render(&self, text: &str) -> String;
}

/// CommonMark to HTML. Raw HTML in the model's answer is shown as text, never injected.
#[derive(Clone, Copy, Debug, Default)]
pub struct CmarkRenderer;
impl MarkdownRenderer for CmarkRenderer {
	fn render(&self, text: &str) -> String {
		let parser = Parser::new_ext(text, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH).map(|event| match event {
			Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
			other => other,
		});
		let mut out = String::with_capacity(text.len() * 3 / 2);
		html::push_html(&mut out, parser);
		out
	}
}

impl<F: Fn(&str) -> String> MarkdownRenderer for F {
	fn render(&self, text: &str) -> String {
		self(text)
	}
}
