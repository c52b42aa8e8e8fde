//! Light markdown for model output: `## ` headings, `**bold**`, `---` rules,
//! everything else paragraphs. Text is HTML-escaped before any markup is added.

use once_cell::sync::Lazy;
use regex::Regex;

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold regex"));

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn inline(text: &str) -> String {
    BOLD_RE
        .replace_all(&escape_html(text), "<strong>$1</strong>")
        .into_owned()
}

pub fn render_markdown(source: &str) -> String {
    let mut html = String::new();
    let mut paragraph: Vec<String> = Vec::new();

    let flush = |paragraph: &mut Vec<String>, html: &mut String| {
        if !paragraph.is_empty() {
            html.push_str("<p>");
            html.push_str(&paragraph.join("<br>"));
            html.push_str("</p>\n");
            paragraph.clear();
        }
    };

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(&mut paragraph, &mut html);
        } else if let Some(heading) = trimmed.strip_prefix("## ") {
            flush(&mut paragraph, &mut html);
            html.push_str(&format!("<h2>{}</h2>\n", inline(heading.trim())));
        } else if trimmed == "---" {
            flush(&mut paragraph, &mut html);
            html.push_str("<hr>\n");
        } else {
            paragraph.push(inline(trimmed));
        }
    }
    flush(&mut paragraph, &mut html);

    html
}

/// First 120 characters of `text`, with an ellipsis when cut.
pub fn excerpt(text: &str) -> String {
    const LIMIT: usize = 120;
    let text = text.trim();
    if text.chars().count() <= LIMIT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(LIMIT).collect();
    cut.push('…');
    cut
}
