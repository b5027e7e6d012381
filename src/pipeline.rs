//! Pipeline orchestrating the rewrite passes over a response body.

use std::borrow::Cow;

use crate::config::{Feature, FeatureFlags};
use crate::oracle::DerivativeOracle;
use crate::passes::{add_js_defer, add_lazy_loading, enhance_images_with_webp, minify_html};

/// High-level helper applying the enabled passes, in order, to one response body.
///
/// Order is lazy-load, defer-js, WebP, then minify so that minification sees the final markup.
pub struct HtmlOptimizer<'o> {
    flags: FeatureFlags,
    oracle: &'o dyn DerivativeOracle,
}

impl<'o> HtmlOptimizer<'o> {
    /// Create an optimizer for one flag snapshot and derivative lookup.
    pub fn new(flags: FeatureFlags, oracle: &'o dyn DerivativeOracle) -> Self {
        Self { flags, oracle }
    }

    /// Flag snapshot this optimizer was built with.
    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    /// Apply the enabled passes to `markup`.
    ///
    /// Returns the input unchanged when the optimizer is disabled or the body is empty; neither
    /// passes nor the oracle are consulted in that case.
    pub fn optimize<'a>(&self, markup: &'a str) -> Cow<'a, str> {
        if !self.flags.is_enabled(Feature::Optimization) || markup.is_empty() {
            return Cow::Borrowed(markup);
        }

        let mut html = Cow::Borrowed(markup);
        if self.flags.is_enabled(Feature::LazyLoadImages) {
            html = run_pass("lazy-load", html, add_lazy_loading);
        }
        if self.flags.is_enabled(Feature::DeferJs) {
            html = run_pass("defer-js", html, add_js_defer);
        }
        if self.flags.is_enabled(Feature::WebpImages) {
            html = run_pass("webp", html, |markup| enhance_images_with_webp(markup, self.oracle));
        }
        if self.flags.is_enabled(Feature::MinifyHtml) {
            html = run_pass("minify", html, minify_html);
        }
        html
    }

    /// Rewrite a response body in place. A missing body is left alone.
    ///
    /// Returns `true` when the body was modified.
    pub fn optimize_response(&self, body: Option<&mut String>) -> bool {
        let Some(body) = body else {
            return false;
        };

        let rewritten = match self.optimize(body.as_str()) {
            Cow::Owned(next) => Some(next),
            Cow::Borrowed(_) => None,
        };
        match rewritten {
            Some(next) => {
                *body = next;
                true
            }
            None => false,
        }
    }
}

/// Apply `flags` to `markup` using `oracle` for WebP derivative lookups.
pub fn optimize<'a>(
    markup: &'a str,
    flags: FeatureFlags,
    oracle: &dyn DerivativeOracle,
) -> Cow<'a, str> {
    HtmlOptimizer::new(flags, oracle).optimize(markup)
}

fn run_pass<'a, F>(name: &str, html: Cow<'a, str>, pass: F) -> Cow<'a, str>
where
    F: for<'b> FnOnce(&'b str) -> Cow<'b, str>,
{
    let rewritten = match pass(&*html) {
        Cow::Borrowed(_) => None,
        Cow::Owned(next) if next.is_empty() => {
            log::warn!("{name}: pass produced an empty document, keeping previous markup");
            None
        }
        Cow::Owned(next) => Some(next),
    };

    match rewritten {
        Some(next) => Cow::Owned(next),
        None => html,
    }
}
