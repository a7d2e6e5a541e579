//! The `_paq` command vocabulary. Names and tuple shapes are dictated by the
//! Matomo tracking script and must match it exactly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command names understood by the Matomo script.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CommandName {
    #[serde(rename = "setTrackerUrl")]
    SetTrackerUrl,
    #[serde(rename = "setSiteId")]
    SetSiteId,
    #[serde(rename = "enableHeartBeatTimer")]
    EnableHeartBeatTimer,
    #[serde(rename = "enableLinkTracking")]
    EnableLinkTracking,
    #[serde(rename = "setCustomDimension")]
    SetCustomDimension,
    #[serde(rename = "setCustomUrl")]
    SetCustomUrl,
    #[serde(rename = "setDocumentTitle")]
    SetDocumentTitle,
    #[serde(rename = "trackEvent")]
    TrackEvent,
    #[serde(rename = "trackSiteSearch")]
    TrackSiteSearch,
    #[serde(rename = "trackPageView")]
    TrackPageView,
    #[serde(rename = "trackLink")]
    TrackLink,
}

impl CommandName {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::SetTrackerUrl => "setTrackerUrl",
            CommandName::SetSiteId => "setSiteId",
            CommandName::EnableHeartBeatTimer => "enableHeartBeatTimer",
            CommandName::EnableLinkTracking => "enableLinkTracking",
            CommandName::SetCustomDimension => "setCustomDimension",
            CommandName::SetCustomUrl => "setCustomUrl",
            CommandName::SetDocumentTitle => "setDocumentTitle",
            CommandName::TrackEvent => "trackEvent",
            CommandName::TrackSiteSearch => "trackSiteSearch",
            CommandName::TrackPageView => "trackPageView",
            CommandName::TrackLink => "trackLink",
        }
    }
}

impl std::fmt::Display for CommandName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-defined `(id, value)` attribute attached to the next tracked command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomDimension {
    pub id: u32,
    pub value: String,
}

impl CustomDimension {
    pub fn new(id: u32, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }
}

/// One queue entry: a command name followed by its arguments. Serializes as
/// a bare JSON array, absent optional arguments as `null`.
///
/// The empty tuple is valid and means "nothing to track".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Command(Vec<Value>);

impl Command {
    pub fn new(name: CommandName, args: Vec<Value>) -> Self {
        let mut tuple = Vec::with_capacity(args.len() + 1);
        tuple.push(Value::from(name.as_str()));
        tuple.extend(args);
        Self(tuple)
    }

    /// An arbitrary tuple, for commands outside the built-in vocabulary.
    pub fn raw(tuple: Vec<Value>) -> Self {
        Self(tuple)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn set_tracker_url(url: &str) -> Self {
        Self::new(CommandName::SetTrackerUrl, vec![url.into()])
    }

    pub fn set_site_id(site_id: Value) -> Self {
        Self::new(CommandName::SetSiteId, vec![site_id])
    }

    pub fn enable_heart_beat_timer() -> Self {
        Self::new(CommandName::EnableHeartBeatTimer, Vec::new())
    }

    pub fn enable_link_tracking() -> Self {
        Self::new(CommandName::EnableLinkTracking, Vec::new())
    }

    pub fn set_custom_dimension(dimension: &CustomDimension) -> Self {
        Self::new(
            CommandName::SetCustomDimension,
            vec![dimension.id.into(), dimension.value.as_str().into()],
        )
    }

    pub fn set_custom_url(url: &str) -> Self {
        Self::new(CommandName::SetCustomUrl, vec![url.into()])
    }

    pub fn set_document_title(title: &str) -> Self {
        Self::new(CommandName::SetDocumentTitle, vec![title.into()])
    }

    pub fn track_event(
        category: &str,
        action: &str,
        name: Option<&str>,
        value: Option<f64>,
    ) -> Self {
        Self::new(
            CommandName::TrackEvent,
            vec![category.into(), action.into(), opt(name), opt(value)],
        )
    }

    pub fn track_site_search(keyword: &str, category: Option<&str>, count: Option<u64>) -> Self {
        Self::new(
            CommandName::TrackSiteSearch,
            vec![keyword.into(), opt(category), opt(count)],
        )
    }

    pub fn track_page_view() -> Self {
        Self::new(CommandName::TrackPageView, Vec::new())
    }

    pub fn track_link(href: &str, link_type: &str) -> Self {
        Self::new(CommandName::TrackLink, vec![href.into(), link_type.into()])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The leading command name, if the tuple has one.
    pub fn name(&self) -> Option<&str> {
        self.0.first().and_then(Value::as_str)
    }

    pub fn is(&self, name: CommandName) -> bool {
        self.name() == Some(name.as_str())
    }

    pub fn args(&self) -> &[Value] {
        self.0.get(1..).unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.0.clone())
    }
}

fn opt<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}
