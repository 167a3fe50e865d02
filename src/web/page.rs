//! HTML listing page served at `/`.

use core::fmt::Write as _;

use crate::app::ports::{FileEntry, FsError, FsUsage};

const STYLE: &str = "body{font-family:monospace;margin:2em;background:#111;color:#ddd}\
table{border-collapse:collapse}td,th{padding:.3em 1em;border-bottom:1px solid #333}\
a{color:#6cf}a.del{color:#f66}";

/// Escape text for HTML element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn query_value(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

pub fn render_index(entries: &[FileEntry], usage: FsUsage) -> String {
    let mut html = String::with_capacity(1024 + entries.len() * 192);
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width\">\
         <title>ChipScope files</title><style>{STYLE}</style></head><body>\
         <h1>ChipScope diagnostic exports</h1>"
    );

    if entries.is_empty() {
        html.push_str("<p>No files saved yet. Run a diagnostic and export it with X.</p>");
    } else {
        html.push_str("<table><tr><th>File</th><th>Size</th><th></th></tr>");
        for entry in entries {
            let shown = escape_html(&entry.name);
            let q = query_value(&entry.name);
            let _ = write!(
                html,
                "<tr><td>{shown}</td><td>{} B</td>\
                 <td><a href=\"/download?file={q}\">download</a> \
                 <a class=\"del\" href=\"/delete?file={q}\" \
                 onclick=\"return confirm('Delete this file?')\">delete</a></td></tr>",
                entry.size
            );
        }
        html.push_str("</table>");
    }

    let _ = write!(
        html,
        "<p>{} file(s) &middot; {} / {} bytes used &middot; \
         <a href=\"/list\">JSON</a></p></body></html>",
        entries.len(),
        usage.used,
        usage.total
    );
    html
}

pub fn render_unavailable(err: FsError) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>ChipScope files</title></head>\
         <body><h1>Storage unavailable</h1><p>{}</p></body></html>",
        escape_html(&err.to_string())
    )
}
