//! Whitespace-collapsing HTML minification.
//!
//! The rules apply uniformly to the whole document, including `<pre>`, `<script>`, `<style>` and
//! `<textarea>` contents.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

struct MinifyRule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

fn minify_rules() -> &'static [MinifyRule] {
    static RULES: OnceLock<Vec<MinifyRule>> = OnceLock::new();
    RULES
        .get_or_init(|| {
            [
                ("whitespace after tags", r">(?-u:\s)+", ">"),
                ("whitespace before tags", r"(?-u:\s)+<", "<"),
                ("horizontal runs", r"[\t ]+", " "),
                ("line lead", r"(?mR)^[\t ]+", ""),
                ("line end", r"(?mR)[\t ]+$", ""),
                ("simple comments", r"(?mR)//[a-zA-Z0-9 ]+$", ""),
                ("line breaks", r"[\r\n]", ""),
                ("whitespace runs", r"(?-u:\s)+", " "),
            ]
            .into_iter()
            .map(|(name, pattern, replacement)| MinifyRule {
                name,
                pattern: Regex::new(pattern).expect("invalid minify regex"),
                replacement,
            })
            .collect()
        })
        .as_slice()
}

/// One pass over the rule table. Returns `None` when no rule changed the text.
fn apply_rules(markup: &str) -> Option<String> {
    let mut current: Option<String> = None;
    for rule in minify_rules() {
        let text = current.as_deref().unwrap_or(markup);
        let next = match rule.pattern.replace_all(text, rule.replacement) {
            Cow::Owned(next) if next != text => next,
            _ => continue,
        };
        log::trace!("minify: applied {}", rule.name);
        current = Some(next);
    }
    current
}

/// Collapse inter-tag and intra-line whitespace and strip simple trailing `//` comments.
///
/// Only ASCII whitespace is collapsed; `&nbsp;` written as U+00A0 is content. The rule table is
/// re-applied until the text stops changing, so minifying already minified markup is a no-op.
///
/// Never produces an empty document from a non-empty one: if the rules would remove everything
/// (for instance a whitespace-only body) the input is returned unchanged.
pub fn minify_html(markup: &str) -> Cow<'_, str> {
    if markup.is_empty() {
        return Cow::Borrowed(markup);
    }

    let Some(mut minified) = apply_rules(markup) else {
        return Cow::Borrowed(markup);
    };
    // After the first round only spaces remain, so every further change shortens the text.
    while let Some(next) = apply_rules(&minified) {
        minified = next;
    }

    if minified.is_empty() {
        log::warn!("minify: rules produced an empty document, keeping original markup");
        return Cow::Borrowed(markup);
    }
    if minified == markup {
        return Cow::Borrowed(markup);
    }

    log::debug!("minify: {} -> {} bytes", markup.len(), minified.len());
    Cow::Owned(minified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_between_tags() {
        assert_eq!(
            minify_html("<div>\n   <p>Hi</p>   \n</div>"),
            "<div><p>Hi</p></div>"
        );
    }

    #[test]
    fn collapses_runs_inside_text() {
        assert_eq!(
            minify_html("<p>Hello\t\t   big  world</p>"),
            "<p>Hello big world</p>"
        );
    }

    #[test]
    fn line_breaks_join_adjacent_text() {
        assert_eq!(minify_html("<p>big\n  world</p>"), "<p>bigworld</p>");
    }

    #[test]
    fn strips_simple_trailing_comments() {
        assert_eq!(
            minify_html("<script>\nvar a = 1; // set a\nrun();\n</script>"),
            "<script>var a = 1; run();</script>"
        );
    }

    #[test]
    fn keeps_urls_that_look_like_comments() {
        assert_eq!(
            minify_html("<a href=\"https://example.com/x\">\n  link\n</a>"),
            "<a href=\"https://example.com/x\">link</a>"
        );
    }

    #[test]
    fn is_idempotent() {
        let once =
            minify_html("<ul>\r\n  <li> a </li>\r\n  <li>b  c</li>\r\n</ul>\n").into_owned();
        assert_eq!(once, "<ul><li>a</li><li>b c</li></ul>");
        assert!(matches!(minify_html(&once), Cow::Borrowed(_)));
    }

    #[test]
    fn comment_before_final_line_break_settles_in_one_call() {
        let once = minify_html("<p>x</p>\ntotal //note\n").into_owned();
        assert_eq!(once, "<p>x</p>total");
        assert!(matches!(minify_html(&once), Cow::Borrowed(_)));

        let chained = minify_html("x //a //b").into_owned();
        assert_eq!(chained, "x");
        assert_eq!(minify_html(&chained), chained);
    }

    #[test]
    fn keeps_non_breaking_spaces() {
        assert!(matches!(minify_html("<p>10\u{a0}kg</p>"), Cow::Borrowed(_)));
        assert_eq!(
            minify_html("<b>a</b>\u{a0}<b>b</b>\n <i>c</i>"),
            "<b>a</b>\u{a0}<b>b</b><i>c</i>"
        );
    }

    #[test]
    fn empty_and_blank_input_fall_back_to_original() {
        assert_eq!(minify_html(""), "");
        assert_eq!(minify_html("  \n\t "), "  \n\t ");
    }
}
