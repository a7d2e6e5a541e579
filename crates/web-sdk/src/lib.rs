//! Matomo tracker wrapper — injects the Matomo script into a page, seeds the
//! `_paq` command queue with tracker configuration, and pushes well-formed
//! command tuples for page views, events, site search, and outbound links.
//!
//! # Modules
//!
//! - [`queue`] — Command queue seam and the in-memory shared queue
//! - [`document`] — Document seam (title, location, script tags, click listeners)
//! - [`tracker`] — The [`Tracker`] wrapper and its tracking parameters
//! - [`declarative`] — Click tracking bound through `data-*` attributes
//! - [`snippet`] — Inline HTML rendering of a queue for server-rendered pages
//! - `web` — Browser backends (`window._paq`, live DOM), behind the `web` feature

pub mod declarative;
pub mod document;
pub mod queue;
pub mod snippet;
pub mod tracker;
#[cfg(feature = "web")]
pub mod web;

pub use document::{ClickHandler, ClickTarget, Document, MemoryDocument, ScriptTag};
pub use queue::{CommandQueue, QueueSlot, SharedQueue};
pub use snippet::render_snippet;
pub use tracker::{EventParams, LinkParams, SiteSearchParams, TrackContext, TrackParams, Tracker};
#[cfg(feature = "web")]
pub use web::{BrowserDocument, PaqQueue};
