//! Inline HTML rendering of a command queue, for pages rendered on the server
//! where the queue is built before the browser ever runs.

use matomo_core::{Command, TrackerResult};

use crate::document::ScriptTag;

/// Render the queued commands as an inline `_paq` bootstrap followed by the
/// Matomo loader tag.
pub fn render_snippet(commands: &[Command], script: &ScriptTag) -> TrackerResult<String> {
    let mut html = String::from("<script>\n");
    html.push_str("var _paq = window._paq = window._paq || [];\n");
    for command in commands {
        let tuple = serde_json::to_string(command)?;
        // `</` inside a string literal would close the inline script.
        html.push_str(&format!("_paq.push({});\n", tuple.replace("</", "<\\/")));
    }
    html.push_str("</script>\n");
    html.push_str(&script.to_html());
    html.push('\n');
    Ok(html)
}
