//! Menu PDF Server Library
//!
//! Turns a paginated HTML layout into a multi-page PDF by rendering every
//! print page in isolation and merging the results in document order.
//! The server binary is in main.rs.
//!
//! # Modules
//!
//! - `pipeline`: Extraction, verification, per-page rendering, compositing
//! - `engine`: Headless browser seam and the Chromium implementation
//! - `markup`: Pure HTML transforms via lol_html
//! - `routes`: HTTP surface

pub mod config;
pub mod engine;
pub mod error;
pub mod markup;
pub mod pipeline;
pub mod routes;
pub mod state;
