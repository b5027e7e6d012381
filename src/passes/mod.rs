//! The HTML rewriting passes.
//!
//! Each pass is a pure function over the markup that returns [`std::borrow::Cow::Borrowed`] when
//! it found nothing to rewrite.

pub mod defer_script;
pub mod lazy_load;
pub mod minify;
pub mod webp;

pub use defer_script::{CRITICAL_SCRIPT_MARKERS, add_js_defer, is_critical_script};
pub use lazy_load::add_lazy_loading;
pub use minify::minify_html;
pub use webp::{enhance_images_with_webp, webp_candidate};

/// Cheap pre-check for a tag opening such as `<img`, ignoring ASCII case.
pub(crate) fn contains_tag_open(markup: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    markup
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::contains_tag_open;

    #[test]
    fn detects_tag_openings_in_any_case() {
        assert!(contains_tag_open("<p><IMG src=x></p>", "<img"));
        assert!(!contains_tag_open("<p>image</p>", "<img"));
        assert!(!contains_tag_open("", "<img"));
    }
}
