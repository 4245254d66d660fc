//! Configuration management for Menu PDF Server

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Errors raised while reading configuration from the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub render: RenderConfig,
    pub markup: MarkupConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for the JSON request body
    pub max_body_bytes: usize,
    /// Generation jobs allowed to hold a browser at the same time
    pub max_concurrent_jobs: usize,
}

/// How the headless browser is launched for each request
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Explicit Chrome/Chromium binary; auto-detected when absent
    pub executable: Option<String>,
    pub headless: bool,
    pub no_sandbox: bool,
    /// Extra command line flags passed verbatim
    pub extra_args: Vec<String>,
}

/// Timing and diagnostic knobs for the render pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Bound on loading one document into a context
    pub load_timeout: Duration,
    /// How long the network must stay quiet before a load counts as done
    pub network_quiet: Duration,
    /// Bound on waiting for images to finish loading or failing
    pub image_timeout: Duration,
    /// Grace period after loading for decode and font application
    pub settle_delay: Duration,
    /// Pause after forcing print styles onto the full document
    pub style_settle_delay: Duration,
    /// Number of boxes recorded in each per-page render check
    pub sample_boxes: usize,
    /// Final documents smaller than this are reported as likely empty
    pub min_output_bytes: usize,
    pub diagnostic_screenshots: bool,
}

/// Class names that identify the print layout inside the submitted markup
#[derive(Debug, Clone, Deserialize)]
pub struct MarkupConfig {
    pub container_class: String,
    pub page_class: String,
    pub canvas_class: String,
    pub box_class: String,
    pub text_box_class: String,
    pub image_box_class: String,
    pub qrcode_box_class: String,
    pub editor_class: String,
}

impl MarkupConfig {
    /// CSS selector for a class name
    pub fn selector(class: &str) -> String {
        format!(".{}", class)
    }

    pub fn page_selector(&self) -> String {
        Self::selector(&self.page_class)
    }

    pub fn box_selector(&self) -> String {
        Self::selector(&self.box_class)
    }
}

impl Default for MarkupConfig {
    fn default() -> Self {
        MarkupConfig {
            container_class: "md-print-pages-container".to_string(),
            page_class: "md-print-page".to_string(),
            canvas_class: "md-canvas".to_string(),
            box_class: "md-box".to_string(),
            text_box_class: "md-box-text".to_string(),
            image_box_class: "md-box-image".to_string(),
            qrcode_box_class: "md-box-qrcode".to_string(),
            editor_class: "md-box-editor".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            load_timeout: Duration::from_secs(30),
            network_quiet: Duration::from_millis(500),
            image_timeout: Duration::from_millis(10_000),
            settle_delay: Duration::from_millis(2_000),
            style_settle_delay: Duration::from_millis(500),
            sample_boxes: 3,
            min_output_bytes: 5_000,
            diagnostic_screenshots: true,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            executable: None,
            headless: true,
            no_sandbox: true,
            extra_args: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                max_body_bytes: 25 * 1024 * 1024,
                max_concurrent_jobs: 2,
            },
            browser: BrowserConfig::default(),
            render: RenderConfig::default(),
            markup: MarkupConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
                max_body_bytes: parse_var("MAX_BODY_BYTES", defaults.server.max_body_bytes)?,
                max_concurrent_jobs: parse_var(
                    "MAX_CONCURRENT_JOBS",
                    defaults.server.max_concurrent_jobs,
                )?
                .max(1),
            },
            browser: BrowserConfig {
                executable: env::var("CHROME_EXECUTABLE").ok().filter(|s| !s.is_empty()),
                headless: parse_var("CHROME_HEADLESS", defaults.browser.headless)?,
                no_sandbox: parse_var("CHROME_NO_SANDBOX", defaults.browser.no_sandbox)?,
                extra_args: env::var("CHROME_ARGS")
                    .map(|raw| split_list(&raw))
                    .unwrap_or_default(),
            },
            render: RenderConfig {
                load_timeout: Duration::from_secs(parse_var(
                    "RENDER_LOAD_TIMEOUT_SECS",
                    defaults.render.load_timeout.as_secs(),
                )?),
                network_quiet: millis_var("RENDER_NETWORK_QUIET_MS", defaults.render.network_quiet)?,
                image_timeout: millis_var("RENDER_IMAGE_TIMEOUT_MS", defaults.render.image_timeout)?,
                settle_delay: millis_var("RENDER_SETTLE_MS", defaults.render.settle_delay)?,
                style_settle_delay: millis_var(
                    "RENDER_STYLE_SETTLE_MS",
                    defaults.render.style_settle_delay,
                )?,
                sample_boxes: parse_var("RENDER_SAMPLE_BOXES", defaults.render.sample_boxes)?,
                min_output_bytes: parse_var(
                    "RENDER_MIN_OUTPUT_BYTES",
                    defaults.render.min_output_bytes,
                )?,
                diagnostic_screenshots: parse_var(
                    "RENDER_DIAGNOSTIC_SCREENSHOTS",
                    defaults.render.diagnostic_screenshots,
                )?,
            },
            markup: defaults.markup,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

fn millis_var(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_var(key, default.as_millis() as u64).map(Duration::from_millis)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
