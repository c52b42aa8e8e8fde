//! Server-rendered HTML for the interview page.

use crate::interview::controller::meets_min_length;
use crate::presenter::markdown::escape_html;
use crate::presenter::{ActiveCard, DeliverableCard, PageView, StepStatus, TimelineCard};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; color: #1f2933; }
.progress { display: flex; gap: .5rem; list-style: none; padding: 0; }
.progress li { flex: 1; padding: .4rem; border-bottom: 3px solid #cbd2d9; font-size: .85rem; }
.progress li.active { border-color: #2563eb; font-weight: 600; }
.progress li.done { border-color: #16a34a; }
.card { border: 1px solid #e4e7eb; border-radius: 8px; padding: 1rem 1.25rem; margin: 1rem 0; }
.coach { background: #f5f7fa; border-radius: 6px; padding: .5rem 1rem; }
.error { color: #b91c1c; }
textarea { width: 100%; min-height: 8rem; font: inherit; }
details.card summary { cursor: pointer; }
.excerpt { color: #52606d; }
"#;

const SCRIPT: &str = r#"
(function () {
  var form = document.getElementById('turn-form');
  if (form) {
    var box = form.querySelector('textarea');
    var button = form.querySelector('button[type=submit]');
    var counter = document.getElementById('char-count');
    var min = parseInt(form.dataset.minChars, 10);
    // Count code points, as the server does
    var count = function () { return Array.from(box.value.trim()).length; };
    var sync = function () {
      var n = count();
      button.disabled = box.readOnly || n < min;
      if (counter) { counter.textContent = n + ' / ' + min + ' characters minimum'; }
    };
    box.addEventListener('input', sync);
    form.addEventListener('submit', function (e) {
      if (box.readOnly || count() < min) { e.preventDefault(); return; }
      box.readOnly = true;
      button.disabled = true;
      document.getElementById('working').hidden = false;
    });
    sync();
  }
  var copy = document.getElementById('copy-deliverable');
  if (copy) {
    copy.addEventListener('click', function () {
      var source = document.getElementById('deliverable-source').value;
      navigator.clipboard.writeText(source).then(function () { copy.textContent = 'Copied'; });
    });
  }
})();
"#;

pub fn render_page(view: &PageView) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>Career Intelligence Interview</title>\n");
    html.push_str(&format!("<style>{STYLE}</style>\n</head>\n<body>\n"));
    html.push_str("<h1>Career Intelligence Interview</h1>\n");

    html.push_str(&render_progress(view));

    for card in &view.timeline {
        html.push_str(&render_timeline_card(card));
    }

    if let Some(active) = &view.active {
        html.push_str(&render_active_card(active));
    }
    if let Some(deliverable) = &view.deliverable {
        html.push_str(&render_deliverable(deliverable));
    }

    html.push_str(
        "<form method=\"post\" action=\"/restart\"><button type=\"submit\">Start over</button></form>\n",
    );
    html.push_str(&format!("<script>{SCRIPT}</script>\n</body>\n</html>\n"));
    html
}

fn render_progress(view: &PageView) -> String {
    let mut html = String::from("<ol class=\"progress\">\n");
    for indicator in &view.progress {
        let class = match indicator.status {
            StepStatus::Upcoming => "upcoming",
            StepStatus::Active => "active",
            StepStatus::Done => "done",
        };
        html.push_str(&format!(
            "<li class=\"{class}\" data-step=\"{}\">{}. {}</li>\n",
            indicator.step.number(),
            indicator.step.number(),
            escape_html(indicator.label)
        ));
    }
    html.push_str("</ol>\n");
    html
}

fn render_timeline_card(card: &TimelineCard) -> String {
    format!(
        "<details class=\"card past\" data-step=\"{step}\">\n\
         <summary><strong>{step}. {label}</strong> <span class=\"excerpt\">{excerpt}</span></summary>\n\
         <p><em>{question}</em></p>\n\
         <p>{response}</p>\n\
         <div class=\"coach\">{reaction}</div>\n\
         </details>\n",
        step = card.step.number(),
        label = escape_html(card.label),
        excerpt = escape_html(&card.excerpt),
        question = escape_html(&card.question_text),
        response = escape_html(&card.response),
        reaction = card.reaction_html,
    )
}

fn render_active_card(card: &ActiveCard) -> String {
    let mut html = format!(
        "<section class=\"card active\" data-step=\"{}\">\n<h2>{}. {}</h2>\n",
        card.step.number(),
        card.step.number(),
        escape_html(card.label)
    );

    if let Some(reply) = &card.coach_reply_html {
        html.push_str(&format!("<div class=\"coach\">{reply}</div>\n"));
    }
    if !card.question_text.is_empty() {
        html.push_str(&format!(
            "<p class=\"question\">{}</p>\n",
            escape_html(&card.question_text)
        ));
    }

    // Browsers drop one leading newline inside <textarea>, so emit one ourselves
    let readonly = if card.locked { " readonly" } else { "" };
    let disabled = if card.locked || !meets_min_length(&card.draft) {
        " disabled"
    } else {
        ""
    };
    html.push_str(&format!(
        "<form id=\"turn-form\" method=\"post\" action=\"/submit\" data-min-chars=\"{min}\">\n\
         <textarea name=\"text\" placeholder=\"{placeholder}\"{readonly}>\n{draft}</textarea>\n\
         <p id=\"char-count\" class=\"excerpt\"></p>\n\
         <button type=\"submit\"{disabled}>Submit</button>\n\
         <span id=\"working\"{hidden}>Thinking…</span>\n\
         </form>\n",
        min = card.min_chars,
        placeholder = escape_html(&card.placeholder_text),
        draft = escape_html(&card.draft),
        hidden = if card.locked { "" } else { " hidden" },
    ));

    if let Some(notice) = &card.notice {
        html.push_str(&format!(
            "<p class=\"error notice\">{}</p>\n",
            escape_html(notice)
        ));
    }
    if let Some(error) = &card.error {
        html.push_str(&format!(
            "<p class=\"error\">{}</p>\n\
             <form method=\"post\" action=\"/retry\"><button type=\"submit\">Try again</button></form>\n",
            escape_html(error)
        ));
    }

    html.push_str("</section>\n");
    html
}

fn render_deliverable(card: &DeliverableCard) -> String {
    format!(
        "<section class=\"card deliverable\">\n\
         {body}\
         <textarea id=\"deliverable-source\" hidden readonly>\n{source}</textarea>\n\
         <button type=\"button\" id=\"copy-deliverable\">Copy to clipboard</button>\n\
         <a href=\"/export\" download>Download session</a>\n\
         </section>\n",
        body = card.html,
        source = escape_html(&card.source),
    )
}
