//! Deferral of non-critical external scripts.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::contains_tag_open;
use crate::tags::QUOTE_AWARE_ATTRS;

/// URL fragments identifying scripts whose execution order must not change.
///
/// Matching is a case-sensitive substring test against the `src` value, so a URL that merely
/// contains one of these fragments is treated as critical too.
pub const CRITICAL_SCRIPT_MARKERS: &[&str] = &[
    "requirejs",
    "require.js",
    "jquery.js",
    "jquery.min.js",
    "knockout.js",
    "mage/requirejs/mixins.js",
    "mage/polyfill.js",
    "mage/bootstrap.js",
];

fn external_script_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r#"(?i)<script\s+((?:{QUOTE_AWARE_ATTRS}\s)?)src\s*=\s*(?:"([^"]*)"|'([^']*)')({QUOTE_AWARE_ATTRS})></script>"#
        ))
        .expect("invalid script regex")
    })
}

/// Returns `true` when the script URL contains any critical-script marker.
pub fn is_critical_script(src: &str) -> bool {
    CRITICAL_SCRIPT_MARKERS
        .iter()
        .any(|marker| src.contains(marker))
}

fn already_scheduled(before: &str, after: &str) -> bool {
    [before, after].iter().any(|attrs| {
        let attrs = attrs.to_ascii_lowercase();
        attrs.contains("defer") || attrs.contains("async")
    })
}

/// Append `defer` to external `<script src=...></script>` tags that are neither already
/// async/deferred nor on the critical allowlist.
///
/// Inline scripts and script tags without a separate closing tag are never touched.
pub fn add_js_defer(markup: &str) -> Cow<'_, str> {
    if !contains_tag_open(markup, "<script") {
        return Cow::Borrowed(markup);
    }

    let mut deferred = 0usize;
    let result = external_script_pattern().replace_all(markup, |caps: &Captures| {
        let before = &caps[1];
        let after = &caps[4];
        let Some(src) = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()) else {
            return caps[0].to_string();
        };

        if already_scheduled(before, after) || is_critical_script(src) || src.contains('"') {
            return caps[0].to_string();
        }

        deferred += 1;
        format!(r#"<script {before}src="{src}"{after} defer></script>"#)
    });

    if deferred == 0 {
        return Cow::Borrowed(markup);
    }
    log::debug!("defer-js: deferred {deferred} script(s)");
    Cow::Owned(result.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defers_plain_external_scripts() {
        assert_eq!(
            add_js_defer(r#"<script src="/static/js/app.js"></script>"#),
            r#"<script src="/static/js/app.js" defer></script>"#
        );
    }

    #[test]
    fn preserves_attributes_around_src_and_requotes() {
        assert_eq!(
            add_js_defer(r#"<script type="text/javascript" src='/js/a.js' data-x="1"></script>"#),
            r#"<script type="text/javascript" src="/js/a.js" data-x="1" defer></script>"#
        );
    }

    #[test]
    fn leaves_async_and_deferred_scripts_alone() {
        for tag in [
            r#"<script src="/static/js/app.js" async></script>"#,
            r#"<script defer src="/static/js/app.js"></script>"#,
            r#"<script src="/static/js/app.js" DEFER></script>"#,
        ] {
            assert!(matches!(add_js_defer(tag), Cow::Borrowed(_)), "{tag}");
        }
    }

    #[test]
    fn never_defers_critical_scripts() {
        for src in CRITICAL_SCRIPT_MARKERS {
            let tag = format!(r#"<script src="/static/frontend/{src}"></script>"#);
            assert_eq!(add_js_defer(&tag), tag.as_str());
        }
        let jquery = r#"<script src="/static/frontend/jquery.min.js"></script>"#;
        assert_eq!(add_js_defer(jquery), jquery);
    }

    #[test]
    fn allowlist_is_case_sensitive_substring() {
        assert!(is_critical_script("/lib/requirejs-config.js"));
        assert!(is_critical_script("/vendor/myjquery.js?v=3"));
        assert!(!is_critical_script("/lib/RequireJS.js"));
    }

    #[test]
    fn ignores_inline_and_void_scripts() {
        let inline = "<script>var a = 1;</script>";
        assert_eq!(add_js_defer(inline), inline);
        let void = r#"<script src="/js/a.js" />"#;
        assert_eq!(add_js_defer(void), void);
        let data_src = r#"<script data-src="/js/a.js"></script>"#;
        assert_eq!(add_js_defer(data_src), data_src);
    }

    #[test]
    fn is_idempotent_across_a_page() {
        let page = concat!(
            r#"<head><script src="/js/require.js"></script>"#,
            r#"<script src="/js/one.js"></script>"#,
            r#"<script>inline()</script>"#,
            r#"<script src="/js/two.js" async></script></head>"#,
        );
        let once = add_js_defer(page).into_owned();
        assert_eq!(once.matches(" defer").count(), 1);
        assert!(once.contains(r#"<script src="/js/one.js" defer></script>"#));
        assert_eq!(add_js_defer(&once), once.as_str());
    }
}
