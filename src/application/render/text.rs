use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str, text};

use super::types::{RenderError, TextExtractor};

const BLOCK_SELECTOR: &str =
    "p, br, div, li, ul, ol, tr, td, th, h1, h2, h3, h4, h5, h6, pre, blockquote, hr, section";

/// Collects the text nodes of an HTML fragment, decodes entities and
/// collapses whitespace runs into single spaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlTextExtractor;

impl HtmlTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for HtmlTextExtractor {
    fn to_text(&self, html: &str) -> Result<String, RenderError> {
        let buffer = Rc::new(RefCell::new(String::with_capacity(html.len())));

        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!(BLOCK_SELECTOR, {
                        let buffer = Rc::clone(&buffer);
                        move |_el| {
                            buffer.borrow_mut().push(' ');
                            Ok(())
                        }
                    }),
                    text!("*", {
                        let buffer = Rc::clone(&buffer);
                        move |chunk| {
                            buffer.borrow_mut().push_str(chunk.as_str());
                            Ok(())
                        }
                    }),
                ],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|err| RenderError::Document {
            message: err.to_string(),
        })?;

        let raw = buffer.borrow();
        Ok(normalize_whitespace(&decode_entities(&raw)))
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        let candidate = &rest[start..];

        match candidate.find(';').and_then(|end| {
            decode_entity(&candidate[1..end]).map(|character| (character, end))
        }) {
            Some((character, end)) => {
                decoded.push(character);
                rest = &candidate[end + 1..];
            }
            None => {
                decoded.push('&');
                rest = &candidate[1..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = name.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
