//! Document seam — the slice of the page the tracker touches: current title
//! and location, script-tag insertion, and click listeners on marked
//! elements.
//!
//! [`MemoryDocument`] is an in-process page model used by servers, the CLI,
//! and tests. The `web` feature adds a live-DOM implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use matomo_core::TrackerResult;
use parking_lot::Mutex;
use tracing::debug;

/// Listener invoked when a bound element is clicked. Errors are raised inside
/// the click dispatch, not returned to whoever bound the listener.
pub type ClickHandler = Arc<dyn Fn(&ClickTarget) -> TrackerResult<()> + Send + Sync>;

/// Attributes of the clicked element, captured at click time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    attributes: BTreeMap<String, String>,
}

impl ClickTarget {
    pub fn new(attributes: BTreeMap<String, String>) -> Self {
        Self { attributes }
    }

    /// Attribute value; empty values count as absent.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ClickTarget {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The Matomo loader element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub script_type: String,
    pub is_async: bool,
    pub defer: bool,
    pub src: String,
}

impl ScriptTag {
    /// Asynchronous, deferred JavaScript reference to `src`.
    pub fn matomo(src: impl Into<String>) -> Self {
        Self {
            script_type: "text/javascript".into(),
            is_async: true,
            defer: true,
            src: src.into(),
        }
    }

    /// Attribute list as it is written onto the element.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = vec![("type", self.script_type.clone())];
        if self.is_async {
            attrs.push(("async", String::new()));
        }
        if self.defer {
            attrs.push(("defer", String::new()));
        }
        attrs.push(("src", self.src.clone()));
        attrs
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from("<script");
        for (name, value) in self.attributes() {
            if value.is_empty() {
                html.push(' ');
                html.push_str(name);
            } else {
                html.push_str(&format!(" {name}=\"{}\"", escape_attribute(&value)));
            }
        }
        html.push_str("></script>");
        html
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// The page as seen by the tracker.
pub trait Document: Send + Sync {
    /// Current document title.
    fn title(&self) -> String;

    /// Current location (full URL).
    fn location(&self) -> String;

    /// Whether a script element with this exact `src` is already present.
    fn has_script(&self, src: &str) -> bool;

    /// Insert the tag immediately before the first existing script element,
    /// or append it when the document has none.
    fn insert_script(&self, tag: &ScriptTag);

    /// Attach `handler` as a click listener to every element whose
    /// `attribute` equals `value`. Returns how many elements were bound.
    fn add_click_listeners(&self, attribute: &str, value: &str, handler: ClickHandler) -> usize;
}

struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    listeners: Vec<ClickHandler>,
}

struct Page {
    title: String,
    location: String,
    elements: Vec<Element>,
}

/// Snapshot of one element in a [`MemoryDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub listener_count: usize,
}

/// In-memory page: a flat list of elements in document order.
pub struct MemoryDocument {
    page: Mutex<Page>,
}

impl MemoryDocument {
    pub fn new(title: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            page: Mutex::new(Page {
                title: title.into(),
                location: location.into(),
                elements: Vec::new(),
            }),
        }
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.page.lock().title = title.into();
    }

    pub fn set_location(&self, location: impl Into<String>) {
        self.page.lock().location = location.into();
    }

    /// Append an element and return its index.
    pub fn add_element<K, V>(&self, tag: &str, attributes: impl IntoIterator<Item = (K, V)>) -> usize
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut page = self.page.lock();
        page.elements.push(Element {
            tag: tag.to_string(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            listeners: Vec::new(),
        });
        page.elements.len() - 1
    }

    pub fn elements(&self) -> Vec<ElementSnapshot> {
        self.page
            .lock()
            .elements
            .iter()
            .map(|e| ElementSnapshot {
                tag: e.tag.clone(),
                attributes: e.attributes.clone(),
                listener_count: e.listeners.len(),
            })
            .collect()
    }

    /// `src` of every script element, in document order.
    pub fn script_sources(&self) -> Vec<String> {
        self.page
            .lock()
            .elements
            .iter()
            .filter(|e| e.tag == "script")
            .filter_map(|e| e.attributes.get("src").cloned())
            .collect()
    }

    /// Dispatch a click on the element at `index`. Every listener runs; the
    /// first listener error is returned. Unknown indices are ignored.
    pub fn click(&self, index: usize) -> TrackerResult<()> {
        // Listeners read the title and location, so the lock is released
        // before they run.
        let (target, listeners) = {
            let page = self.page.lock();
            match page.elements.get(index) {
                Some(element) => (
                    ClickTarget::new(element.attributes.clone()),
                    element.listeners.clone(),
                ),
                None => return Ok(()),
            }
        };

        let mut first_error = None;
        for listener in listeners {
            if let Err(e) = listener(&target) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl Document for MemoryDocument {
    fn title(&self) -> String {
        self.page.lock().title.clone()
    }

    fn location(&self) -> String {
        self.page.lock().location.clone()
    }

    fn has_script(&self, src: &str) -> bool {
        self.page
            .lock()
            .elements
            .iter()
            .any(|e| e.tag == "script" && e.attributes.get("src").map(String::as_str) == Some(src))
    }

    fn insert_script(&self, tag: &ScriptTag) {
        let element = Element {
            tag: "script".into(),
            attributes: tag
                .attributes()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            listeners: Vec::new(),
        };

        let mut page = self.page.lock();
        match page.elements.iter().position(|e| e.tag == "script") {
            Some(first) => page.elements.insert(first, element),
            None => page.elements.push(element),
        }
        debug!(src = %tag.src, "script element inserted");
    }

    fn add_click_listeners(&self, attribute: &str, value: &str, handler: ClickHandler) -> usize {
        let mut page = self.page.lock();
        let mut bound = 0;
        for element in page
            .elements
            .iter_mut()
            .filter(|e| e.attributes.get(attribute).map(String::as_str) == Some(value))
        {
            element.listeners.push(handler.clone());
            bound += 1;
        }
        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matomo_core::TrackerError;

    #[test]
    fn test_script_inserted_before_first_script() {
        let doc = MemoryDocument::new("Home", "https://example.com/");
        doc.add_element("div", [("id", "app")]);
        doc.add_element("script", [("src", "/bundle.js")]);

        doc.insert_script(&ScriptTag::matomo("http://x/matomo.js"));

        let elements = doc.elements();
        assert_eq!(elements[0].tag, "div");
        assert_eq!(elements[1].attributes["src"], "http://x/matomo.js");
        assert_eq!(elements[1].attributes["type"], "text/javascript");
        assert!(elements[1].attributes.contains_key("async"));
        assert!(elements[1].attributes.contains_key("defer"));
        assert_eq!(doc.script_sources(), vec!["http://x/matomo.js", "/bundle.js"]);
    }

    #[test]
    fn test_script_appended_without_scripts() {
        let doc = MemoryDocument::default();
        doc.add_element("div", [("id", "app")]);
        doc.insert_script(&ScriptTag::matomo("http://x/matomo.js"));

        let elements = doc.elements();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].tag, "script");
        assert!(doc.has_script("http://x/matomo.js"));
        assert!(!doc.has_script("http://y/matomo.js"));
    }

    #[test]
    fn test_script_tag_html() {
        let tag = ScriptTag::matomo("https://stats.example.com/matomo.js?a=1&b=2");
        assert_eq!(
            tag.to_html(),
            r#"<script type="text/javascript" async defer src="https://stats.example.com/matomo.js?a=1&amp;b=2"></script>"#
        );
    }

    #[test]
    fn test_click_runs_every_listener() {
        let doc = MemoryDocument::default();
        let button = doc.add_element("button", [("data-track-event", "click")]);
        doc.add_element("button", [("data-track-event", "hover")]);

        let ok: ClickHandler = Arc::new(|_: &ClickTarget| -> TrackerResult<()> { Ok(()) });
        let failing: ClickHandler = Arc::new(|_: &ClickTarget| -> TrackerResult<()> {
            Err(TrackerError::missing("trackEvents", vec!["action"]))
        });

        assert_eq!(doc.add_click_listeners("data-track-event", "click", failing), 1);
        assert_eq!(doc.add_click_listeners("data-track-event", "click", ok), 1);
        assert_eq!(doc.elements()[button].listener_count, 2);
        assert_eq!(doc.elements()[1].listener_count, 0);

        let err = doc.click(button).unwrap_err();
        assert!(err.is_missing_field());

        assert!(doc.click(99).is_ok());
    }

    #[test]
    fn test_click_target_treats_empty_as_absent() {
        let target: ClickTarget = [("data-event-name", ""), ("data-event-category", "Nav")]
            .into_iter()
            .collect();
        assert_eq!(target.attribute("data-event-name"), None);
        assert_eq!(target.attribute("data-event-category"), Some("Nav"));
        assert_eq!(target.attribute("data-event-action"), None);
    }
}
