//! Headless Chromium engine over the DevTools protocol
//!
//! One browser process per request. Each isolated context is a fresh tab that
//! is closed before the next one opens.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventLoadingFailed, EventLoadingFinished,
    EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, PrintToPdfParams, Viewport,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{scripts, EngineError, EngineLauncher, RenderContext, RenderEngine};
use crate::config::{BrowserConfig, MarkupConfig};
use crate::pipeline::{DocumentInspection, PageGeometry, PrintSettings, RenderCheck, A4_PAGE};

/// Launches a local Chrome/Chromium for each request
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<ChromeConfig, EngineError> {
        let mut builder = ChromeConfig::builder()
            .window_size(A4_PAGE.width, A4_PAGE.height)
            .arg("--ignore-certificate-errors")
            .arg("--hide-scrollbars")
            .arg("--font-render-hinting=none");

        if !self.config.headless {
            builder = builder.with_head();
        }
        if self.config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(executable) = &self.config.executable {
            builder = builder.chrome_executable(executable);
        }
        for arg in &self.config.extra_args {
            builder = builder.arg(arg.as_str());
        }

        builder.build().map_err(EngineError::Launch)
    }
}

#[async_trait]
impl EngineLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderEngine>, EngineError> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| EngineError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while its handler is polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error: {}", e);
                }
            }
            tracing::debug!("CDP handler loop finished");
        });

        tracing::debug!("Browser launched");

        Ok(Box::new(ChromiumEngine {
            browser: Mutex::new(Some(browser)),
            handler_task: parking_lot::Mutex::new(Some(handler_task)),
        }))
    }
}

/// A running browser process
pub struct ChromiumEngine {
    browser: Mutex<Option<Browser>>,
    handler_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn open_context(&self) -> Result<Box<dyn RenderContext>, EngineError> {
        let browser = self.browser.lock().await;
        let browser = browser
            .as_ref()
            .ok_or_else(|| EngineError::Protocol("browser already shut down".to_string()))?;

        let page = browser.new_page("about:blank").await?;
        let network = match NetworkMonitor::attach(&page).await {
            Ok(network) => network,
            Err(e) => {
                if let Err(close_err) = page.close().await {
                    tracing::debug!("Failed to close tab after monitor error: {}", close_err);
                }
                return Err(e);
            }
        };
        Ok(Box::new(ChromiumContext { page, network }))
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let closed = browser.close().await.map(|_| ());
        if let Err(e) = browser.wait().await {
            tracing::warn!("Failed to reap browser process: {}", e);
        }
        if let Some(task) = self.handler_task.lock().take() {
            task.abort();
        }

        tracing::debug!("Browser shut down");
        closed.map_err(EngineError::from)
    }
}

/// Poll interval while waiting for the network to go quiet
const NETWORK_POLL: Duration = Duration::from_millis(50);

enum RequestEvent {
    Started(String),
    Settled(String),
}

#[derive(Debug)]
struct NetworkActivity {
    in_flight: HashSet<String>,
    last_change: Instant,
}

/// Tracks a tab's in-flight requests from its Network domain events
struct NetworkMonitor {
    activity: Arc<parking_lot::Mutex<NetworkActivity>>,
    task: JoinHandle<()>,
}

impl NetworkMonitor {
    /// Subscribe before anything is loaded so no request is missed
    async fn attach(page: &Page) -> Result<Self, EngineError> {
        page.execute(NetworkEnableParams::default()).await?;

        let started = page
            .event_listener::<EventRequestWillBeSent>()
            .await?
            .map(|e| RequestEvent::Started(e.request_id.inner().clone()));
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await?
            .map(|e| RequestEvent::Settled(e.request_id.inner().clone()));
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await?
            .map(|e| RequestEvent::Settled(e.request_id.inner().clone()));
        let mut events = stream::select_all([started.boxed(), finished.boxed(), failed.boxed()]);

        let activity = Arc::new(parking_lot::Mutex::new(NetworkActivity {
            in_flight: HashSet::new(),
            last_change: Instant::now(),
        }));

        let tracked = activity.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let mut activity = tracked.lock();
                match event {
                    RequestEvent::Started(id) => {
                        activity.in_flight.insert(id);
                    }
                    RequestEvent::Settled(id) => {
                        activity.in_flight.remove(&id);
                    }
                }
                activity.last_change = Instant::now();
            }
        });

        Ok(Self { activity, task })
    }

    /// Restart the quiet window
    fn touch(&self) {
        self.activity.lock().last_change = Instant::now();
    }

    async fn idle(&self, quiet: Duration) {
        loop {
            let wait = {
                let activity = self.activity.lock();
                let quiet_for = activity.last_change.elapsed();
                if activity.in_flight.is_empty() && quiet_for >= quiet {
                    return;
                }
                if activity.in_flight.is_empty() {
                    (quiet - quiet_for).min(NETWORK_POLL)
                } else {
                    NETWORK_POLL
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A single tab
pub struct ChromiumContext {
    page: Page,
    network: NetworkMonitor,
}

impl ChromiumContext {
    async fn evaluate<T: DeserializeOwned>(&self, script: String) -> Result<T, EngineError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(EngineError::Script)?;

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| EngineError::Script(e.to_string()))?;

        Ok(result.into_value()?)
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn set_viewport(&self, geometry: &PageGeometry) -> Result<(), EngineError> {
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                geometry.width as i64,
                geometry.height as i64,
                geometry.device_scale_factor,
                false,
            ))
            .await?;
        Ok(())
    }

    async fn load(&self, html: &str) -> Result<(), EngineError> {
        self.page.set_content(html).await?;
        // Subresource events may still be queued behind the content reply
        self.network.touch();
        Ok(())
    }

    async fn await_network_idle(&self, quiet: Duration) -> Result<(), EngineError> {
        self.network.idle(quiet).await;
        Ok(())
    }

    async fn await_images(&self, per_image: Duration) -> Result<(), EngineError> {
        let images: u64 = self
            .evaluate(scripts::await_images(per_image.as_millis() as u64))
            .await?;
        tracing::trace!("{} images settled", images);
        Ok(())
    }

    async fn force_print_layout(
        &self,
        markup: &MarkupConfig,
        geometry: &PageGeometry,
    ) -> Result<(), EngineError> {
        let pages: u64 = self
            .evaluate(scripts::force_print_layout(markup, geometry))
            .await?;
        tracing::trace!("Forced print layout on {} pages", pages);
        Ok(())
    }

    async fn inspect(&self, markup: &MarkupConfig) -> Result<DocumentInspection, EngineError> {
        self.evaluate(scripts::inspect(markup)).await
    }

    async fn page_fragments(&self, markup: &MarkupConfig) -> Result<Vec<String>, EngineError> {
        self.evaluate(scripts::page_fragments(markup)).await
    }

    async fn render_check(
        &self,
        markup: &MarkupConfig,
        geometry: &PageGeometry,
        sample: usize,
    ) -> Result<RenderCheck, EngineError> {
        self.evaluate(scripts::render_check(markup, geometry, sample))
            .await
    }

    async fn screenshot(&self, clip: Option<&PageGeometry>) -> Result<Vec<u8>, EngineError> {
        let builder = ScreenshotParams::builder().format(CaptureScreenshotFormat::Png);
        let params = match clip {
            Some(geometry) => builder
                .clip(Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: geometry.width as f64,
                    height: geometry.height as f64,
                    scale: 1.0,
                })
                .full_page(false)
                .build(),
            None => builder.full_page(true).build(),
        };

        Ok(self.page.screenshot(params).await?)
    }

    async fn print_pdf(&self, settings: &PrintSettings) -> Result<Vec<u8>, EngineError> {
        let params = PrintToPdfParams {
            landscape: Some(settings.landscape),
            display_header_footer: Some(settings.display_header_footer),
            print_background: Some(settings.print_background),
            paper_width: Some(settings.paper_width),
            paper_height: Some(settings.paper_height),
            margin_top: Some(settings.margins.top),
            margin_bottom: Some(settings.margins.bottom),
            margin_left: Some(settings.margins.left),
            margin_right: Some(settings.margins.right),
            prefer_css_page_size: Some(settings.prefer_css_page_size),
            ..Default::default()
        };

        Ok(self.page.pdf(params).await?)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.page.clone().close().await?;
        Ok(())
    }
}
