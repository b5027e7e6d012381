//! `<picture>` wrapping for images that have a WebP derivative.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::contains_tag_open;
use crate::oracle::{DerivativeOracle, DerivativeStatus, check_contained};
use crate::tags::{QUOTE_AWARE_ATTRS, TagMatch};

const EXCLUDED_EXTENSIONS: &[&str] = &["svg", "gif"];

fn raster_image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r#"(?i)<img(\s(?:{QUOTE_AWARE_ATTRS}\s)?)src\s*=\s*(?:"([^"]+?\.(jpe?g|png)(?:\?[^"]*)?)"|'([^']+?\.(jpe?g|png)(?:\?[^']*)?)')({QUOTE_AWARE_ATTRS})>"#
        ))
        .expect("invalid raster img regex")
    })
}

/// Derive the WebP sibling of an image URL.
///
/// The query string and fragment are dropped and the last extension of the path is replaced:
/// `/img/banner.jpg?v=3` becomes `/img/banner.webp`.
pub fn webp_candidate(src: &str) -> Option<String> {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let dot = path.rfind('.')?;
    if path[dot..].contains('/') {
        return None;
    }
    Some(format!("{}.webp", &path[..dot]))
}

/// Whether the markup right before `offset` is a `<source type="image/webp">` tag, i.e. the
/// image at `offset` has already been wrapped.
fn follows_webp_source(markup: &str, offset: usize) -> bool {
    let preceding = markup[..offset].trim_end();
    if !preceding.ends_with('>') {
        return false;
    }
    let Some(open) = preceding.rfind('<') else {
        return false;
    };
    TagMatch::parse(&preceding[open..]).is_some_and(|tag| {
        tag.is("source")
            && tag
                .attribute("type")
                .is_some_and(|attribute| attribute.value_is("image/webp"))
    })
}

/// Wrap `.jpg`/`.jpeg`/`.png` images in a `<picture>` element offering the WebP derivative,
/// but only when `oracle` confirms that derivative exists.
///
/// The original `<img>` tag is kept verbatim as the fallback. A failing or panicking oracle
/// leaves the image unchanged.
pub fn enhance_images_with_webp<'a, O>(markup: &'a str, oracle: &O) -> Cow<'a, str>
where
    O: DerivativeOracle + ?Sized,
{
    if !contains_tag_open(markup, "<img") {
        return Cow::Borrowed(markup);
    }

    let mut wrapped = 0usize;
    let result = raster_image_pattern().replace_all(markup, |caps: &Captures| {
        let original = &caps[0];
        let (Some(src), Some(extension)) = (
            caps.get(2).or_else(|| caps.get(4)),
            caps.get(3).or_else(|| caps.get(5)),
        ) else {
            return original.to_string();
        };

        let extension = extension.as_str().to_ascii_lowercase();
        if EXCLUDED_EXTENSIONS.contains(&extension.as_str()) {
            return original.to_string();
        }

        let offset = caps.get(0).map_or(0, |m| m.start());
        if follows_webp_source(markup, offset) {
            return original.to_string();
        }

        let Some(candidate) = webp_candidate(src.as_str()) else {
            return original.to_string();
        };
        if candidate.contains('"') {
            return original.to_string();
        }

        match check_contained(oracle, &candidate) {
            DerivativeStatus::Found(webp_url) if webp_url.contains('"') => original.to_string(),
            DerivativeStatus::Found(webp_url) => {
                wrapped += 1;
                format!(
                    r#"<picture><source srcset="{webp_url}" type="image/webp">{original}</picture>"#
                )
            }
            DerivativeStatus::NotFound => original.to_string(),
            DerivativeStatus::CheckFailed(err) => {
                log::warn!("webp: keeping {} unchanged: {err}", src.as_str());
                original.to_string()
            }
        }
    });

    if wrapped == 0 {
        return Cow::Borrowed(markup);
    }
    log::debug!("webp: wrapped {wrapped} image(s) in <picture>");
    Cow::Owned(result.into_owned())
}
