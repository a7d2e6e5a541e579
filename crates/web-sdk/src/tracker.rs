//! The tracker wrapper — resolves options, seeds the queue once, ensures the
//! Matomo script is loaded, and turns tracking calls into ordered `_paq`
//! tuples.

use std::sync::{Arc, Weak};

use matomo_core::{
    Command, CustomDimension, TrackerConfig, TrackerError, TrackerOptions, TrackerResult,
};
use tracing::{debug, info};

use crate::document::{Document, ScriptTag};
use crate::queue::CommandQueue;

/// Page context sent ahead of a tracked command.
///
/// | Field | Default |
/// |---|---|
/// | `document_title` | current document title |
/// | `url` | current location |
/// | `custom_dimensions` | disabled (no `setCustomDimension` tuples) |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackContext {
    pub document_title: Option<String>,
    pub url: Option<String>,
    pub custom_dimensions: Option<Vec<CustomDimension>>,
}

impl TrackContext {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.document_title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add a dimension after any already present.
    pub fn with_dimension(mut self, id: u32, value: impl Into<String>) -> Self {
        self.custom_dimensions
            .get_or_insert_with(Vec::new)
            .push(CustomDimension::new(id, value));
        self
    }
}

/// Input to [`Tracker::track`]. An empty `data` tuple makes the call a no-op.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackParams {
    pub data: Command,
    pub context: TrackContext,
}

impl TrackParams {
    pub fn new(data: Command) -> Self {
        Self {
            data,
            context: TrackContext::default(),
        }
    }

    pub fn with_context(mut self, context: TrackContext) -> Self {
        self.context = context;
        self
    }
}

/// Input to [`Tracker::track_event`]. `category` and `action` are mandatory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventParams {
    pub category: Option<String>,
    pub action: Option<String>,
    pub name: Option<String>,
    pub value: Option<f64>,
    pub context: TrackContext,
}

impl EventParams {
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            action: Some(action.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_context(mut self, context: TrackContext) -> Self {
        self.context = context;
        self
    }
}

/// Input to [`Tracker::track_site_search`]. `keyword` is mandatory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteSearchParams {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub count: Option<u64>,
    pub context: TrackContext,
}

impl SiteSearchParams {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_context(mut self, context: TrackContext) -> Self {
        self.context = context;
        self
    }
}

/// Input to [`Tracker::track_link`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParams {
    pub href: String,
    /// Defaults to `"link"`; Matomo also accepts `"download"`.
    pub link_type: Option<String>,
}

impl LinkParams {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            link_type: None,
        }
    }

    pub fn with_link_type(mut self, link_type: impl Into<String>) -> Self {
        self.link_type = Some(link_type.into());
        self
    }
}

const DEFAULT_LINK_TYPE: &str = "link";

/// Matomo tracker bound to one queue and one document.
///
/// Cloning is cheap and every clone pushes to the same queue.
#[derive(Clone)]
pub struct Tracker {
    config: Arc<TrackerConfig>,
    queue: Arc<dyn CommandQueue>,
    document: Arc<dyn Document>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("config", &self.config)
            .field("queued", &self.queue.len())
            .finish()
    }
}

/// A tracker that does not keep its document alive. Held by listeners the
/// document itself stores.
#[derive(Clone)]
pub(crate) struct WeakTracker {
    config: Arc<TrackerConfig>,
    queue: Arc<dyn CommandQueue>,
    document: Weak<dyn Document>,
}

impl WeakTracker {
    /// `None` once the document has been dropped.
    pub(crate) fn upgrade(&self) -> Option<Tracker> {
        Some(Tracker {
            config: self.config.clone(),
            queue: self.queue.clone(),
            document: self.document.upgrade()?,
        })
    }
}

impl Tracker {
    /// Resolve `options` and initialize the page.
    ///
    /// Fails with [`TrackerError::Configuration`] when no base URL is set.
    /// Seeds the queue with `setTrackerUrl`, `setSiteId`,
    /// `enableHeartBeatTimer`, `enableLinkTracking` only if it is empty, then
    /// makes sure the Matomo script element is present.
    pub fn create(
        options: &TrackerOptions,
        queue: Arc<dyn CommandQueue>,
        document: Arc<dyn Document>,
    ) -> TrackerResult<Self> {
        let config = options.resolve()?;
        let tracker = Self {
            config: Arc::new(config),
            queue,
            document,
        };
        tracker.initialize_queue();
        tracker.ensure_script();
        Ok(tracker)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<dyn CommandQueue> {
        &self.queue
    }

    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    pub(crate) fn downgrade(&self) -> WeakTracker {
        WeakTracker {
            config: self.config.clone(),
            queue: self.queue.clone(),
            document: Arc::downgrade(&self.document),
        }
    }

    fn initialize_queue(&self) {
        if !self.queue.is_empty() {
            debug!(queued = self.queue.len(), "queue already initialized");
            return;
        }

        self.queue.push_all(vec![
            Command::set_tracker_url(&self.config.tracker_url),
            Command::set_site_id(self.config.site_id.clone()),
            Command::enable_heart_beat_timer(),
            Command::enable_link_tracking(),
        ]);

        info!(
            tracker_url = %self.config.tracker_url,
            site_id = %self.config.site_id,
            "matomo queue initialized"
        );
    }

    fn ensure_script(&self) {
        if self.document.has_script(&self.config.src_url) {
            debug!(src = %self.config.src_url, "matomo script already present");
            return;
        }
        self.document
            .insert_script(&ScriptTag::matomo(self.config.src_url.as_str()));
    }

    /// Track a page view with the current (or overridden) title and URL.
    pub fn track_page_view(&self, context: TrackContext) {
        self.track(TrackParams {
            data: Command::track_page_view(),
            context,
        });
    }

    /// Track an event. Appends nothing when `category` or `action` is absent.
    pub fn track_event(&self, params: EventParams) -> TrackerResult<()> {
        let EventParams {
            category,
            action,
            name,
            value,
            context,
        } = params;

        let (category, action) = match (non_empty(category), non_empty(action)) {
            (Some(category), Some(action)) => (category, action),
            (category, action) => {
                let mut fields = Vec::new();
                if category.is_none() {
                    fields.push("category");
                }
                if action.is_none() {
                    fields.push("action");
                }
                return Err(TrackerError::missing("trackEvent", fields));
            }
        };

        self.track(TrackParams {
            data: Command::track_event(&category, &action, name.as_deref(), value),
            context,
        });
        Ok(())
    }

    /// Track an internal site search. Appends nothing when `keyword` is absent.
    pub fn track_site_search(&self, params: SiteSearchParams) -> TrackerResult<()> {
        let SiteSearchParams {
            keyword,
            category,
            count,
            context,
        } = params;

        let keyword = non_empty(keyword)
            .ok_or_else(|| TrackerError::missing("trackSiteSearch", vec!["keyword"]))?;

        self.track(TrackParams {
            data: Command::track_site_search(&keyword, category.as_deref(), count),
            context,
        });
        Ok(())
    }

    /// Track an outbound link or download. Pushes the single `trackLink`
    /// tuple without any URL, title, or dimension context.
    pub fn track_link(&self, params: LinkParams) {
        let link_type = params.link_type.as_deref().unwrap_or(DEFAULT_LINK_TYPE);
        debug!(href = %params.href, link_type, "tracking link");
        self.queue.push(Command::track_link(&params.href, link_type));
    }

    /// Push `data` preceded by its context: custom dimensions in order, then
    /// `setCustomUrl`, then `setDocumentTitle`. An empty tuple is skipped.
    pub fn track(&self, params: TrackParams) {
        let TrackParams { data, context } = params;
        if data.is_empty() {
            debug!("empty command tuple, nothing tracked");
            return;
        }

        let TrackContext {
            document_title,
            url,
            custom_dimensions,
        } = context;

        let dimensions = custom_dimensions.unwrap_or_default();
        let mut batch = Vec::with_capacity(dimensions.len() + 3);
        batch.extend(dimensions.iter().map(Command::set_custom_dimension));

        let url = url.unwrap_or_else(|| self.document.location());
        let title = document_title.unwrap_or_else(|| self.document.title());
        batch.push(Command::set_custom_url(&url));
        batch.push(Command::set_document_title(&title));

        debug!(
            command = data.name().unwrap_or_default(),
            dimensions = dimensions.len(),
            %url,
            "tracking command"
        );
        batch.push(data);

        self.queue.push_all(batch);
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
