//! Native lazy loading for images.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::contains_tag_open;
use crate::tags::{QUOTE_AWARE_ATTRS, TagMatch};

const LAZY_ATTRIBUTE: &str = r#" loading="lazy""#;

fn image_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"(?i)<img(?:\s{QUOTE_AWARE_ATTRS})?/?>")).expect("invalid img regex")
    })
}

/// Inject `loading="lazy"` into every `<img>` tag that does not already declare a loading mode.
///
/// Tags carrying any `loading` attribute, in any case or quote style, are left byte-for-byte
/// unchanged, which makes the pass idempotent.
pub fn add_lazy_loading(markup: &str) -> Cow<'_, str> {
    if !contains_tag_open(markup, "<img") {
        return Cow::Borrowed(markup);
    }

    let mut rewritten = 0usize;
    let result = image_tag_pattern().replace_all(markup, |caps: &Captures| {
        let source = &caps[0];
        match TagMatch::parse(source) {
            Some(tag) if !tag.has_attribute("loading") => {
                rewritten += 1;
                tag.with_appended(LAZY_ATTRIBUTE)
            }
            _ => source.to_string(),
        }
    });

    if rewritten == 0 {
        return Cow::Borrowed(markup);
    }
    log::debug!("lazy-load: marked {rewritten} image(s)");
    Cow::Owned(result.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_lazy_loading_before_closing_bracket() {
        assert_eq!(
            add_lazy_loading(r#"<p><img src="/a.jpg" alt="A"></p>"#),
            r#"<p><img src="/a.jpg" alt="A" loading="lazy"></p>"#
        );
    }

    #[test]
    fn keeps_existing_loading_modes_untouched() {
        for tag in [
            r#"<img src="/a.jpg" loading="eager">"#,
            r#"<img loading='EAGER' src="/a.jpg">"#,
            r#"<img src="/a.jpg" LOADING="auto" alt="x">"#,
            r#"<img loading=lazy src="/a.jpg">"#,
        ] {
            assert!(matches!(add_lazy_loading(tag), Cow::Borrowed(_)), "{tag}");
        }
    }

    #[test]
    fn is_idempotent() {
        let input = concat!(
            r#"<img src="/a.jpg">"#,
            r#"<div><img src="/b.png" loading="eager"></div>"#,
            r#"<img src="/c.gif"/>"#,
        );
        let once = add_lazy_loading(input).into_owned();
        let twice = add_lazy_loading(&once).into_owned();
        assert_eq!(once, twice);
        assert_eq!(once.matches("loading=").count(), 3);
    }

    #[test]
    fn handles_self_closing_and_bare_tags() {
        assert_eq!(
            add_lazy_loading(r#"<img src="/a.jpg" />"#),
            r#"<img src="/a.jpg" loading="lazy" />"#
        );
        assert_eq!(add_lazy_loading("<img>"), r#"<img loading="lazy">"#);
    }

    #[test]
    fn keeps_trailing_slash_of_unquoted_src() {
        assert_eq!(
            add_lazy_loading("<img src=/a/b/>"),
            r#"<img src=/a/b/ loading="lazy">"#
        );
    }

    #[test]
    fn does_not_confuse_attribute_values_with_loading() {
        assert_eq!(
            add_lazy_loading(r#"<img alt="loading=&quot;eager&quot; > gone" src="/a.jpg">"#),
            r#"<img alt="loading=&quot;eager&quot; > gone" src="/a.jpg" loading="lazy">"#
        );
    }

    #[test]
    fn skips_markup_without_images() {
        assert!(matches!(add_lazy_loading("<p>imagery</p>"), Cow::Borrowed(_)));
        assert!(matches!(add_lazy_loading(""), Cow::Borrowed(_)));
        assert!(matches!(add_lazy_loading("<imgur-widget>"), Cow::Borrowed(_)));
    }

    #[test]
    fn tolerates_unterminated_tags() {
        let input = r#"<div><img src="/a.jpg" alt="broken"#;
        assert_eq!(add_lazy_loading(input), input);
    }
}
