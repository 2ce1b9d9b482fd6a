use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::escape::resolve_html5_entity;
use regex::{Captures, Regex};

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[A-Za-z][A-Za-z0-9]*);").expect("valid regex")
});

/// Line breaks together with the indentation that follows them.
pub const LINE_BREAK_PATTERN: &str = "\r*\n *";

static LINE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LINE_BREAK_PATTERN).expect("valid regex"));

/// Collapse every line break, and the indentation following it, to nothing.
pub fn minify(markup: &str) -> Cow<'_, str> {
    LINE_BREAK_RE.replace_all(markup, "")
}

fn resolve(reference: &str) -> Option<Cow<'static, str>> {
    if let Some(number) = reference.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(|c| Cow::Owned(c.to_string()));
    }

    resolve_html5_entity(reference).map(Cow::Borrowed)
}

/// Resolve HTML/XML entity and character references.
///
/// Unknown references are left as they are, so arbitrary recorded text never fails to decode.
pub fn unescape_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    ENTITY_RE.replace_all(text, |caps: &Captures| match resolve(&caps[1]) {
        Some(resolved) => resolved.into_owned(),
        None => caps[0].to_owned(),
    })
}
