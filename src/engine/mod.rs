//! Rendering engine collaborator
//!
//! The pipeline drives a layout-and-paint engine it cannot look inside. This
//! module defines the narrow capability it relies on (isolated contexts,
//! document loading, structural inspection, printing) and provides the
//! headless Chromium implementation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use menu_pdf_server::engine::{ChromiumLauncher, EngineLauncher};
//!
//! let launcher = ChromiumLauncher::new(config.browser.clone());
//! let engine = launcher.launch().await?;
//! let context = engine.open_context().await?;
//! context.set_viewport(&A4_PAGE).await?;
//! context.load(&html).await?;
//! let pdf = context.print_pdf(&PrintSettings::default()).await?;
//! context.close().await?;
//! engine.shutdown().await?;
//! ```

mod chromium;
mod error;
pub mod scripts;
mod traits;

#[cfg(test)]
pub mod mock;

pub use chromium::{ChromiumContext, ChromiumEngine, ChromiumLauncher};
pub use error::EngineError;
pub use traits::{EngineLauncher, RenderContext, RenderEngine};
