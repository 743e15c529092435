//! HTML components for the SmartScript page
//!
//! Every piece of user or model text passes through `html_escape` before it
//! reaches the markup.

use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

use crate::language::{Language, ProcessingMode};
use crate::localization::{is_rtl, LocalizationManager};
use crate::session::{AnalysisResult, SessionState};

/// Which tab of the page is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Ocr,
    Qa,
}

impl Tab {
    /// Parse the `tab` query value, defaulting to the OCR tab
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("qa") => Tab::Qa,
            _ => Tab::Ocr,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Ocr => "ocr",
            Tab::Qa => "qa",
        }
    }
}

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

impl NoticeKind {
    fn css_class(&self) -> &'static str {
        match self {
            NoticeKind::Info => "notice info",
            NoticeKind::Warning => "notice warning",
            NoticeKind::Error => "notice error",
        }
    }
}

/// Notification shown above a tab's content
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Everything needed to render the page once
pub struct PageView<'a> {
    pub localization: &'a LocalizationManager,
    pub locale: &'static str,
    pub tab: Tab,
    pub session: &'a SessionState,
    pub notice: Option<&'a Notice>,
    pub max_upload_mb: u64,
}

impl PageView<'_> {
    fn t(&self, key: &str) -> String {
        self.localization.get_message_in_language(key, self.locale, None)
    }

    fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.localization
            .get_message_with_args_in_language(key, self.locale, args)
    }

    /// Link target that keeps the UI language
    fn href(&self, path: &str, tab: Option<Tab>) -> String {
        match tab {
            Some(tab) => format!("{}?tab={}&ui={}", path, tab.as_str(), self.locale),
            None => format!("{}?ui={}", path, self.locale),
        }
    }
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 960px; padding: 1.5rem; color: #1f2933; }
header h1 { margin-bottom: 0.25rem; }
.subtitle { color: #52606d; margin-top: 0; }
nav.tabs a { display: inline-block; padding: 0.5rem 1rem; border-bottom: 3px solid transparent; text-decoration: none; color: inherit; }
nav.tabs a.active { border-color: #7b61ff; font-weight: 600; }
.ui-languages a { margin-inline-end: 0.75rem; }
section { margin-top: 1.25rem; }
.notice { padding: 0.75rem 1rem; border-radius: 6px; margin: 1rem 0; }
.notice.info { background: #e6f0ff; }
.notice.warning { background: #fff4e0; }
.notice.error { background: #ffe8e8; }
.metrics { display: flex; gap: 2rem; }
.metric .value { font-size: 1.5rem; font-weight: 600; }
pre.extracted { white-space: pre-wrap; background: #f5f7fa; padding: 1rem; border-radius: 6px; }
img.preview { max-width: 100%; max-height: 480px; border: 1px solid #d9e2ec; }
"#;

/// Render the whole page
pub fn render_page(view: &PageView<'_>) -> String {
    let dir = if is_rtl(view.locale) { "rtl" } else { "ltr" };
    let title = view.t("app-title");

    let mut html = String::with_capacity(8 * 1024);
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="{locale}" dir="{dir}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
"#,
        locale = view.locale,
        title = encode_text(&title),
    );

    render_header(&mut html, view, &title);
    render_tabs(&mut html, view);

    if let Some(notice) = view.notice {
        render_notice(&mut html, notice);
    }

    match view.tab {
        Tab::Ocr => render_ocr_tab(&mut html, view),
        Tab::Qa => render_qa_tab(&mut html, view),
    }

    let _ = write!(
        html,
        r#"<form method="post" action="{action}"><button type="submit">{reset}</button></form>
</body>
</html>
"#,
        action = encode_double_quoted_attribute(&view.href("/reset", None)),
        reset = encode_text(&view.t("reset-button")),
    );

    html
}

fn render_header(html: &mut String, view: &PageView<'_>, title: &str) {
    let _ = write!(
        html,
        "<header>\n<h1>{}</h1>\n<p class=\"subtitle\">{}</p>\n",
        encode_text(title),
        encode_text(&view.t("app-subtitle")),
    );

    let _ = write!(
        html,
        "<div class=\"ui-languages\">{}: ",
        encode_text(&view.t("ui-language"))
    );
    for language in Language::ALL {
        let _ = write!(
            html,
            r#"<a href="/?tab={}&amp;ui={}" lang="{}">{}</a>"#,
            view.tab.as_str(),
            language.code(),
            language.code(),
            encode_text(language.native_name()),
        );
    }
    html.push_str("</div>\n</header>\n");
}

fn render_tabs(html: &mut String, view: &PageView<'_>) {
    html.push_str("<nav class=\"tabs\">\n");
    for (tab, key) in [(Tab::Ocr, "tab-ocr"), (Tab::Qa, "tab-qa")] {
        let class = if tab == view.tab { " class=\"active\"" } else { "" };
        let _ = writeln!(
            html,
            r#"<a href="{}"{}>{}</a>"#,
            encode_double_quoted_attribute(&view.href("/", Some(tab))),
            class,
            encode_text(&view.t(key)),
        );
    }
    html.push_str("</nav>\n");
}

/// Render a notification box
pub fn render_notice(html: &mut String, notice: &Notice) {
    let _ = writeln!(
        html,
        r#"<div class="{}" role="status">{}</div>"#,
        notice.kind.css_class(),
        encode_text(&notice.text),
    );
}

fn render_ocr_tab(html: &mut String, view: &PageView<'_>) {
    let session = view.session;

    let _ = write!(
        html,
        r#"<section id="ocr">
<form method="post" action="{action}" enctype="multipart/form-data">
<label for="language">{language_label}</label>
<select id="language" name="language">
"#,
        action = encode_double_quoted_attribute(&view.href("/analyze", None)),
        language_label = encode_text(&view.t("language-label")),
    );
    for language in Language::ALL {
        let selected = if language == session.language { " selected" } else { "" };
        let label = if language.native_name() == language.display_name() {
            language.display_name().to_string()
        } else {
            format!("{} ({})", language.display_name(), language.native_name())
        };
        let _ = writeln!(
            html,
            r#"<option value="{}"{}>{}</option>"#,
            language.code(),
            selected,
            encode_text(&label),
        );
    }
    html.push_str("</select>\n");

    let _ = write!(
        html,
        "<fieldset>\n<legend>{}</legend>\n",
        encode_text(&view.t("mode-label"))
    );
    for mode in ProcessingMode::ALL {
        let checked = if mode == session.mode { " checked" } else { "" };
        let key = match mode {
            ProcessingMode::Traditional => "mode-traditional",
            ProcessingMode::GenAiEnhanced => "mode-genai",
        };
        let _ = writeln!(
            html,
            r#"<label><input type="radio" name="mode" value="{}"{}> {}</label>"#,
            mode.as_str(),
            checked,
            encode_text(&view.t(key)),
        );
    }
    html.push_str("</fieldset>\n");

    let max_mb = view.max_upload_mb.to_string();
    let _ = write!(
        html,
        r#"<label for="document">{upload}</label>
<input id="document" type="file" name="document" accept="image/png,image/jpeg">
<small>{hint}</small>
<button type="submit">{analyze}</button>
</form>
"#,
        upload = encode_text(&view.t("upload-label")),
        hint = encode_text(&view.t_args("upload-hint", &[("max_mb", max_mb.as_str())])),
        analyze = encode_text(&view.t("analyze-button")),
    );

    if let Some(image) = &session.image {
        let alt = image
            .file_name
            .clone()
            .unwrap_or_else(|| view.t("uploaded-image"));
        let _ = write!(
            html,
            r#"<figure><img class="preview" src="/image" alt="{}"><figcaption>{}</figcaption></figure>
"#,
            encode_double_quoted_attribute(&alt),
            encode_text(&view.t("uploaded-image")),
        );
    }

    if let Some(result) = &session.result {
        render_result(html, view, result);
    }

    html.push_str("</section>\n");
}

/// Render the extracted text and the analysis metrics
pub fn render_result(html: &mut String, view: &PageView<'_>, result: &AnalysisResult) {
    if let Some(notice) = &result.notice {
        render_notice(html, &Notice::warning(notice.clone()));
    }

    let text_dir = if result.language.is_rtl() { "rtl" } else { "ltr" };
    let seconds = format!("{:.2}", result.processing_secs);
    let confidence = format!("{:.2}", result.confidence);

    let _ = write!(
        html,
        r#"<h2>{extracted}</h2>
<pre class="extracted" lang="{lang}" dir="{text_dir}">{text}</pre>
<h2>{results}</h2>
<div class="metrics">
<div class="metric"><div>{time_label}</div><div class="value">{time}</div></div>
<div class="metric"><div>{confidence_label}</div><div class="value">{confidence}</div></div>
</div>
<p class="source">{source}</p>
"#,
        extracted = encode_text(&view.t("extracted-text")),
        lang = result.language.code(),
        text = encode_text(&result.text),
        results = encode_text(&view.t("analysis-results")),
        time_label = encode_text(&view.t("processing-time")),
        time = encode_text(&view.t_args("processing-time-value", &[("seconds", seconds.as_str())])),
        confidence_label = encode_text(&view.t("confidence-score")),
        confidence = encode_text(&view.t_args("confidence-value", &[("confidence", confidence.as_str())])),
        source = encode_text(&view.t_args("text-source", &[("source", result.source.as_str())])),
    );
}

fn render_qa_tab(html: &mut String, view: &PageView<'_>) {
    html.push_str("<section id=\"qa\">\n");

    if view.session.extracted_text().is_none() {
        render_notice(html, &Notice::info(view.t("qa-need-document")));
        html.push_str("</section>\n");
        return;
    }

    let _ = write!(
        html,
        r#"<form method="post" action="{action}">
<label for="question">{label}</label>
<input id="question" type="text" name="question" required>
<button type="submit">{ask}</button>
</form>
"#,
        action = encode_double_quoted_attribute(&view.href("/ask", None)),
        label = encode_text(&view.t("qa-question-label")),
        ask = encode_text(&view.t("qa-ask-button")),
    );

    if let Some(exchange) = &view.session.last_qa {
        let _ = write!(
            html,
            r#"<div class="exchange">
<p><strong>{q}</strong> {question}</p>
<p><strong>{a}</strong> {answer}</p>
</div>
"#,
            q = encode_text(&view.t("qa-question-prefix")),
            question = encode_text(&exchange.question),
            a = encode_text(&view.t("qa-answer-prefix")),
            answer = encode_text(&exchange.answer),
        );
    }

    html.push_str("</section>\n");
}
