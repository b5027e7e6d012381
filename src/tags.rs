//! Tokenized attribute view over a single matched tag.
//!
//! Passes locate tags with regular expressions, but every decision about which attributes a tag
//! carries goes through [`TagMatch`] so attribute order, quote style and self-closing forms are
//! handled in one place.

use std::sync::OnceLock;

use regex::Regex;

/// Pattern fragment matching the attribute region of a tag without stopping at a `>` that sits
/// inside a quoted attribute value.
pub(crate) const QUOTE_AWARE_ATTRS: &str = r#"(?:"[^"]*"|'[^']*'|[^'">])*"#;

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("invalid attribute regex")
    })
}

/// A trailing `/` closes the tag unless it is the last byte of an unquoted attribute value, as
/// in `<img src=/a/b/>`.
fn ends_self_closing(inner: &str) -> bool {
    inner.ends_with('/')
        && !attribute_pattern()
            .captures_iter(inner)
            .last()
            .and_then(|caps| caps.get(4))
            .is_some_and(|value| value.end() == inner.len())
}

/// Quote style used for an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// `name="value"`
    Double,
    /// `name='value'`
    Single,
    /// `name=value`
    Unquoted,
}

/// Single attribute parsed from a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name exactly as written.
    pub name: &'a str,
    /// Attribute value, or `None` for boolean attributes such as `defer`.
    pub value: Option<&'a str>,
    /// Quote style of the value, `None` when the attribute has no value.
    pub quote: Option<Quote>,
}

impl Attribute<'_> {
    /// Case-insensitive comparison of the attribute value.
    pub fn value_is(&self, expected: &str) -> bool {
        self.value
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected))
    }
}

/// One tag occurrence together with its parsed attributes.
#[derive(Debug, Clone)]
pub struct TagMatch<'a> {
    /// Full tag text, from `<` to `>` inclusive.
    pub source: &'a str,
    /// Tag name as written.
    pub name: &'a str,
    /// Attributes in document order.
    pub attributes: Vec<Attribute<'a>>,
    /// Whether the tag ends in `/>`.
    pub self_closing: bool,
}

impl<'a> TagMatch<'a> {
    /// Parse an opening tag. Returns `None` for closing tags, comments and anything that is not a
    /// single `<name ...>` element.
    pub fn parse(source: &'a str) -> Option<Self> {
        let inner = source.strip_prefix('<')?.strip_suffix('>')?;
        let self_closing = ends_self_closing(inner);
        let inner = if self_closing { &inner[..inner.len() - 1] } else { inner };

        let name_end = inner
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(inner.len());
        let name = &inner[..name_end];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return None;
        }

        let attributes = attribute_pattern()
            .captures_iter(&inner[name_end..])
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str();
                let (value, quote) = if let Some(value) = caps.get(2) {
                    (Some(value.as_str()), Some(Quote::Double))
                } else if let Some(value) = caps.get(3) {
                    (Some(value.as_str()), Some(Quote::Single))
                } else if let Some(value) = caps.get(4) {
                    (Some(value.as_str()), Some(Quote::Unquoted))
                } else {
                    (None, None)
                };
                Some(Attribute { name, value, quote })
            })
            .collect();

        Some(Self {
            source,
            name,
            attributes,
            self_closing,
        })
    }

    /// Returns `true` when the tag name matches, ignoring ASCII case.
    pub fn is(&self, tag_name: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag_name)
    }

    /// First attribute with the given name, ignoring ASCII case.
    pub fn attribute(&self, name: &str) -> Option<&Attribute<'a>> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
    }

    /// Returns `true` when the tag carries the attribute at all.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Value of the first attribute with the given name.
    pub fn attribute_value(&self, name: &str) -> Option<&'a str> {
        self.attribute(name).and_then(|attribute| attribute.value)
    }

    /// Rebuild the tag with `fragment` inserted right before its closing `>` (or before `/>` for
    /// self-closing tags). Everything else is kept byte-for-byte.
    pub fn with_appended(&self, fragment: &str) -> String {
        let body = &self.source[..self.source.len() - 1];
        if !self.self_closing {
            return format!("{body}{fragment}>");
        }

        let head = body[..body.len() - 1].trim_end();
        let tail = &body[head.len()..];
        format!("{head}{fragment}{tail}>")
    }
}
