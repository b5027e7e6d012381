//! `html-optimizer` command line: reads a rendered page, runs the enabled passes and writes the
//! result.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use storefront_html_optimizer::oracle::{
    CdnOracle, LocalDerivativeStore, MemoizedOracle, NoDerivatives,
};
use storefront_html_optimizer::{
    DerivativeOracle, Feature, FeatureFlags, HtmlOptimizer, OptimizerConfig,
};

/// Rewrite storefront HTML for faster page loads.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// HTML file to optimize, `-` for stdin.
    #[clap(default_value = "-")]
    input: String,
    /// Write the result here instead of stdout.
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// JSON configuration file. Defaults to `html-optimizer.config.json` in the working directory.
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Enable every pass.
    #[clap(short, long)]
    all: bool,
    /// Add `loading="lazy"` to images.
    #[clap(long)]
    lazy_load: bool,
    /// Defer non-critical external scripts.
    #[clap(long)]
    defer_js: bool,
    /// Offer WebP derivatives through `<picture>`.
    #[clap(long)]
    webp: bool,
    /// Minify the final markup.
    #[clap(long)]
    minify: bool,
    /// Local directory mirroring the public URL layout of WebP derivatives.
    #[clap(long)]
    derivatives_dir: Option<PathBuf>,
    /// CDN base URL queried with HEAD requests for WebP derivatives.
    #[clap(long)]
    cdn_base_url: Option<String>,
    /// Timeout for a single CDN lookup, in milliseconds.
    #[clap(long)]
    cdn_timeout_ms: Option<u64>,
    /// Log what each pass did to stderr.
    #[clap(short, long)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> Result<OptimizerConfig> {
        let mut config = match &self.config {
            Some(path) => OptimizerConfig::from_path(path)?,
            None => OptimizerConfig::discover(&std::env::current_dir()?),
        };

        let switches = [
            (Feature::LazyLoadImages, self.lazy_load),
            (Feature::DeferJs, self.defer_js),
            (Feature::WebpImages, self.webp),
            (Feature::MinifyHtml, self.minify),
        ];
        if self.all {
            config.flags = FeatureFlags::all();
        }
        for (feature, requested) in switches {
            if requested {
                config.flags = config.flags.with(feature, true).with(Feature::Optimization, true);
            }
        }

        if self.derivatives_dir.is_some() {
            config.derivatives_dir = self.derivatives_dir.clone();
        }
        if self.cdn_base_url.is_some() {
            config.cdn_base_url = self.cdn_base_url.clone();
        }
        if self.cdn_timeout_ms.is_some() {
            config.cdn_timeout_ms = self.cdn_timeout_ms;
        }
        Ok(config)
    }

    fn read_input(&self) -> Result<String> {
        if self.input == "-" {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read HTML from stdin")?;
            return Ok(buffer);
        }
        fs::read_to_string(&self.input).with_context(|| format!("failed to read {}", self.input))
    }

    fn write_output(&self, html: &str) -> Result<()> {
        match &self.output {
            Some(path) => {
                fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))
            }
            None => io::stdout()
                .write_all(html.as_bytes())
                .context("failed to write HTML to stdout"),
        }
    }
}

fn derivative_oracle(config: &OptimizerConfig) -> Result<Box<dyn DerivativeOracle>> {
    if let Some(base_url) = &config.cdn_base_url {
        let timeout: Duration = config.cdn_timeout();
        let cdn = CdnOracle::new(base_url.as_str(), timeout)
            .with_context(|| format!("failed to build CDN client for {base_url}"))?;
        log::info!("checking WebP derivatives against {base_url}");
        return Ok(Box::new(MemoizedOracle::new(cdn)));
    }

    if let Some(dir) = &config.derivatives_dir {
        log::info!("checking WebP derivatives under {}", dir.display());
        return Ok(Box::new(MemoizedOracle::new(LocalDerivativeStore::new(dir))));
    }

    Ok(Box::new(NoDerivatives))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        use env_logger::Env;
        let env = Env::default()
            .filter_or("RUST_LOG", "info")
            .write_style_or("RUST_LOG_STYLE", "always");

        env_logger::init_from_env(env);
    }

    let config = cli.load_config()?;
    let oracle = derivative_oracle(&config)?;
    let html = cli.read_input()?;

    if config.flags.enabled && !config.flags.any_pass_enabled() {
        log::warn!("optimization is enabled but no pass is; output will match input");
    }

    let optimizer = HtmlOptimizer::new(config.flags, oracle.as_ref());
    log::debug!("running with {:?}", optimizer.flags());
    let optimized = optimizer.optimize(&html);
    log::info!("optimized {} -> {} bytes", html.len(), optimized.len());

    cli.write_output(&optimized)
}
