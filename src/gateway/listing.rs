//! Directory listing page

use crate::identifier::ContentIdentifier;
use crate::store::{DirectoryEntry, EntryKind};
use std::fmt::Write;

/// Render an HTML index of `entries`, in their stored order.
///
/// Links are absolute, built from the raw `request_path`, so they work with or
/// without a trailing slash.
pub fn render_listing(
    request_path: &str,
    display_path: &str,
    identifier: &ContentIdentifier,
    entries: &[DirectoryEntry],
) -> String {
    let base = request_path.trim_end_matches('/');
    let title = escape_html(display_path);

    let mut html = String::with_capacity(512 + entries.len() * 128);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>Index of {title}</title>");
    html.push_str(
        "<style>body{font-family:monospace;margin:2em}td{padding:0 1em 0 0}.cid{color:#777}</style>\n",
    );
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>Index of {title}</h1>");
    let _ = writeln!(html, "<p class=\"cid\">{}</p>", escape_html(&identifier.to_string()));
    html.push_str("<table>\n");

    if let Some((parent, _)) = base.rsplit_once('/').filter(|_| base.matches('/').count() > 2) {
        let _ = writeln!(
            html,
            "<tr><td><a href=\"{}\">..</a></td><td></td><td></td></tr>",
            escape_html(parent)
        );
    }

    for entry in entries {
        let name = escape_html(&entry.name);
        let href = format!("{base}/{}", urlencoding::encode(&entry.name));
        let suffix = match entry.kind {
            EntryKind::Directory => "/",
            EntryKind::File => "",
        };
        let _ = writeln!(
            html,
            "<tr><td><a href=\"{}\">{name}{suffix}</a></td><td>{}</td><td class=\"cid\">{}</td></tr>",
            escape_html(&href),
            entry.size,
            entry.identifier
        );
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
