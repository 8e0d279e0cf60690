use lol_html::{element, text, HtmlRewriter, Settings};
use std::cell::RefCell;
use std::rc::Rc;
use url::Url;

use crate::normalize::defragment;

/// Tag names whose entire subtree (header/nav chrome, scripts,
/// styles, asides) is dropped before text extraction, per the
/// boilerplate-removal step of the content pipeline.
const BOILERPLATE_TAGS: &str = "header, footer, nav, script, style, aside";

pub struct ParsedPage {
    /// Visible text with single-space separators, trimmed.
    pub text: String,
    /// Outbound `<a href>` targets, resolved against the base URL and
    /// defragmented. Unfiltered — the caller applies `is_valid`.
    pub links: Vec<String>,
}

/// Parses an HTML document with a forgiving streaming parser,
/// stripping boilerplate tag subtrees and collecting both visible text
/// and outbound links in a single pass.
pub fn parse_html(input: &str, base_url: &str) -> ParsedPage {
    let base = Url::parse(base_url).ok();
    let text_chunks = Rc::new(RefCell::new(Vec::<String>::new()));
    let links = Rc::new(RefCell::new(Vec::<String>::new()));

    {
        let text_chunks = text_chunks.clone();
        let links = links.clone();
        let base_for_links = base.clone();

        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![
                    element!(BOILERPLATE_TAGS, |el| {
                        el.remove();
                        Ok(())
                    }),
                    element!("a[href]", move |el| {
                        if let Some(href) = el.get_attribute("href") {
                            if let Some(resolved) = resolve_link(base_for_links.as_ref(), &href) {
                                links.borrow_mut().push(defragment(&resolved));
                            }
                        }
                        Ok(())
                    }),
                    text!("*", move |chunk| {
                        let chunk_text = chunk.as_str();
                        if !chunk_text.trim().is_empty() {
                            text_chunks.borrow_mut().push(chunk_text.to_string());
                        }
                        Ok(())
                    }),
                ],
                ..Settings::new()
            },
            |_: &[u8]| {},
        );

        if rewriter.write(input.as_bytes()).is_err() {
            return ParsedPage {
                text: String::new(),
                links: Vec::new(),
            };
        }
        let _ = rewriter.end();
    }

    let text = text_chunks
        .borrow()
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    ParsedPage {
        text,
        links: links.borrow().clone(),
    }
}

fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    if let Ok(absolute) = Url::parse(href) {
        if absolute.scheme() == "http" || absolute.scheme() == "https" {
            return Some(absolute.to_string());
        }
    }
    base.and_then(|b| b.join(href).ok()).map(|u| u.to_string())
}
