//! End-to-end tracker flow against the in-memory queue and document.

use std::sync::Arc;

use matomo_core::{Command, TrackerError, TrackerOptions};
use matomo_web_sdk::{
    CommandQueue, EventParams, LinkParams, MemoryDocument, QueueSlot, SharedQueue, SiteSearchParams,
    TrackContext, TrackParams, Tracker,
};
use serde_json::json;

fn page() -> Arc<MemoryDocument> {
    let document = Arc::new(MemoryDocument::new(
        "Spring Sale",
        "https://shop.example.com/sale",
    ));
    document.add_element("div", [("id", "app")]);
    document.add_element("script", [("src", "/static/app.js")]);
    document
}

fn names(queue: &SharedQueue) -> Vec<String> {
    queue
        .snapshot()
        .iter()
        .map(|c| c.name().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn construction_without_base_fails() {
    let slot = QueueSlot::new();
    let err = Tracker::create(
        &TrackerOptions {
            url_base: Some(String::new()),
            ..Default::default()
        },
        slot.get_or_create(),
        page(),
    )
    .unwrap_err();
    assert!(matches!(err, TrackerError::Configuration(_)));
}

#[test]
fn repeated_construction_initializes_once() {
    let slot = QueueSlot::new();
    let document = page();
    let options = TrackerOptions::new("http://x").with_site_id(9);

    Tracker::create(&options, slot.get_or_create(), document.clone()).unwrap();
    Tracker::create(&options, slot.get_or_create(), document.clone()).unwrap();

    let queue = slot.get_or_create();
    assert_eq!(
        names(&queue),
        vec![
            "setTrackerUrl",
            "setSiteId",
            "enableHeartBeatTimer",
            "enableLinkTracking",
        ]
    );
    // One loader, placed before the page's own script.
    assert_eq!(
        document.script_sources(),
        vec!["http://x/matomo.js", "/static/app.js"]
    );
}

#[test]
fn trailing_separator_is_not_doubled() {
    for base in ["http://x", "http://x/"] {
        let queue = SharedQueue::new();
        let document = Arc::new(MemoryDocument::default());
        Tracker::create(
            &TrackerOptions::new(base),
            Arc::new(queue.clone()),
            document.clone(),
        )
        .unwrap();

        assert_eq!(document.script_sources(), vec!["http://x/matomo.js"]);
        assert_eq!(
            queue.snapshot()[0].to_json(),
            json!(["setTrackerUrl", "http://x/matomo.php"])
        );
    }
}

#[test]
fn full_session_queue_order() {
    let slot = QueueSlot::new();
    let document = page();
    let tracker = Tracker::create(
        &TrackerOptions::new("https://stats.example.com")
            .with_site_id("12")
            .with_tracker_url("https://collect.example.com/hit"),
        slot.get_or_create(),
        document.clone(),
    )
    .unwrap();

    tracker.track_page_view(TrackContext::default().with_dimension(2, "returning"));
    tracker
        .track_event(EventParams::new("Cart", "Add").with_value(19.99))
        .unwrap();
    tracker
        .track_site_search(SiteSearchParams::new("boots").with_category("shoes"))
        .unwrap();
    tracker.track_link(LinkParams::new("https://partner.example.org"));
    tracker.track(TrackParams::default());

    let queue = slot.get_or_create();
    let tuples: Vec<_> = queue.snapshot().iter().map(Command::to_json).collect();
    assert_eq!(
        tuples,
        vec![
            json!(["setTrackerUrl", "https://collect.example.com/hit"]),
            json!(["setSiteId", "12"]),
            json!(["enableHeartBeatTimer"]),
            json!(["enableLinkTracking"]),
            json!(["setCustomDimension", 2, "returning"]),
            json!(["setCustomUrl", "https://shop.example.com/sale"]),
            json!(["setDocumentTitle", "Spring Sale"]),
            json!(["trackPageView"]),
            json!(["setCustomUrl", "https://shop.example.com/sale"]),
            json!(["setDocumentTitle", "Spring Sale"]),
            json!(["trackEvent", "Cart", "Add", null, 19.99]),
            json!(["setCustomUrl", "https://shop.example.com/sale"]),
            json!(["setDocumentTitle", "Spring Sale"]),
            json!(["trackSiteSearch", "boots", "shoes", null]),
            json!(["trackLink", "https://partner.example.org", "link"]),
        ]
    );
}

#[test]
fn dimensions_precede_custom_url_in_order() {
    let queue = SharedQueue::new();
    let tracker = Tracker::create(
        &TrackerOptions::new("http://x"),
        Arc::new(queue.clone()),
        page(),
    )
    .unwrap();
    queue.drain();

    let context = (1..=5).fold(TrackContext::default(), |ctx, id| {
        ctx.with_dimension(id, format!("v{id}"))
    });
    tracker
        .track_site_search(SiteSearchParams::new("q").with_context(context))
        .unwrap();

    let snapshot = queue.snapshot();
    assert_eq!(snapshot.len(), 8);
    for (i, command) in snapshot[..5].iter().enumerate() {
        let id = i as u32 + 1;
        assert_eq!(
            command.to_json(),
            json!(["setCustomDimension", id, format!("v{id}")])
        );
    }
    assert_eq!(snapshot[5].name(), Some("setCustomUrl"));
}

#[test]
fn declarative_tracking_end_to_end() {
    let slot = QueueSlot::new();
    let document = page();
    let tracker = Tracker::create(
        &TrackerOptions::new("http://x"),
        slot.get_or_create(),
        document.clone(),
    )
    .unwrap();

    let good = document.add_element(
        "button",
        [
            ("data-track-event", "click"),
            ("data-event-category", "Newsletter"),
            ("data-event-action", "Subscribe"),
        ],
    );
    let bad = document.add_element("button", [("data-track-event", "click")]);

    assert_eq!(tracker.track_events(), 2);

    document.click(good).unwrap();
    let err = document.click(bad).unwrap_err();
    assert!(err.is_missing_field());

    let queue = slot.get_or_create();
    assert_eq!(queue.len(), 4 + 3);
    assert_eq!(
        queue.snapshot().last().unwrap().to_json(),
        json!(["trackEvent", "Newsletter", "Subscribe", null, null])
    );
}
