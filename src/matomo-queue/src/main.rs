//! matomo-queue — builds a Matomo `_paq` command queue from the command line.
//!
//! Prints the queue as JSON, or with `--snippet` as the inline HTML a
//! server-rendered page embeds to bootstrap tracking.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use matomo_core::{CustomDimension, TrackerOptions};
use matomo_web_sdk::{
    render_snippet, EventParams, LinkParams, MemoryDocument, ScriptTag, SharedQueue,
    SiteSearchParams, TrackContext, Tracker,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "matomo-queue")]
#[command(about = "Build a Matomo tracking command queue")]
#[command(version)]
struct Cli {
    /// Optional TOML file with tracker options
    #[arg(long)]
    config: Option<String>,

    /// Matomo base URL (overrides config)
    #[arg(long, env = "MATOMO__URL_BASE")]
    url_base: Option<String>,

    /// Site identifier (overrides config)
    #[arg(long, env = "MATOMO__SITE_ID")]
    site_id: Option<String>,

    /// Explicit tracking endpoint
    #[arg(long, env = "MATOMO__TRACKER_URL")]
    tracker_url: Option<String>,

    /// Explicit script source
    #[arg(long, env = "MATOMO__SRC_URL")]
    src_url: Option<String>,

    /// Title of the page being rendered
    #[arg(long, default_value = "")]
    title: String,

    /// URL of the page being rendered
    #[arg(long, default_value = "")]
    location: String,

    /// Emit an inline HTML snippet instead of JSON
    #[arg(long, default_value_t = false)]
    snippet: bool,

    #[command(subcommand)]
    track: Option<Track>,
}

#[derive(Subcommand, Debug)]
enum Track {
    /// Track a page view
    PageView(ContextArgs),
    /// Track an event
    Event {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        value: Option<f64>,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Track an internal site search
    Search {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        count: Option<u64>,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Track an outbound link or download
    Link {
        #[arg(long)]
        href: String,
        #[arg(long)]
        link_type: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ContextArgs {
    /// Overrides the page title for this command
    #[arg(long)]
    document_title: Option<String>,

    /// Overrides the page URL for this command
    #[arg(long)]
    custom_url: Option<String>,

    /// Custom dimension as ID=VALUE, repeatable
    #[arg(long = "dimension", value_parser = parse_dimension)]
    dimensions: Vec<CustomDimension>,
}

impl From<ContextArgs> for TrackContext {
    fn from(args: ContextArgs) -> Self {
        TrackContext {
            document_title: args.document_title,
            url: args.custom_url,
            custom_dimensions: (!args.dimensions.is_empty()).then_some(args.dimensions),
        }
    }
}

fn parse_dimension(raw: &str) -> Result<CustomDimension, String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{raw}'"))?;
    let id = id
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid dimension id '{id}': {e}"))?;
    Ok(CustomDimension::new(id, value))
}

fn parse_site_id(raw: &str) -> serde_json::Value {
    raw.parse::<i64>()
        .map(serde_json::Value::from)
        .unwrap_or_else(|_| serde_json::Value::from(raw))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matomo_queue=info,matomo_web_sdk=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => TrackerOptions::load_from(path),
        None => TrackerOptions::load(),
    };
    let mut options = loaded.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load tracker options, using defaults");
        TrackerOptions::default()
    });

    if let Some(url_base) = cli.url_base {
        options.url_base = Some(url_base);
    }
    if let Some(site_id) = cli.site_id.as_deref() {
        options.site_id = parse_site_id(site_id);
    }
    if let Some(tracker_url) = cli.tracker_url {
        options.tracker_url = Some(tracker_url);
    }
    if let Some(src_url) = cli.src_url {
        options.src_url = Some(src_url);
    }

    let queue = SharedQueue::new();
    let document = Arc::new(MemoryDocument::new(cli.title, cli.location));
    let tracker = Tracker::create(&options, Arc::new(queue.clone()), document)?;

    info!(
        url_base = %tracker.config().url_base,
        site_id = %tracker.config().site_id,
        "tracker ready"
    );

    match cli.track {
        Some(Track::PageView(context)) => tracker.track_page_view(context.into()),
        Some(Track::Event {
            category,
            action,
            name,
            value,
            context,
        }) => tracker.track_event(EventParams {
            category,
            action,
            name,
            value,
            context: context.into(),
        })?,
        Some(Track::Search {
            keyword,
            category,
            count,
            context,
        }) => tracker.track_site_search(SiteSearchParams {
            keyword,
            category,
            count,
            context: context.into(),
        })?,
        Some(Track::Link { href, link_type }) => tracker.track_link(LinkParams { href, link_type }),
        None => {}
    }

    let output = if cli.snippet {
        render_snippet(
            &queue.snapshot(),
            &ScriptTag::matomo(tracker.config().src_url.as_str()),
        )?
    } else {
        queue.to_json_pretty()?
    };
    println!("{output}");

    Ok(())
}
