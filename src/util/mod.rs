use regex::Regex;
use std::sync::LazyLock;

static BR_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").ok());
static ANY_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());
static DEFAULT_TITLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(New note|Nouvelle note|Neue Notiz|Nueva nota|Nova nota)( \(\d+\))?$").ok());

const TITLE_PLACEHOLDER: &str = "Title ?";

pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// The server collapses bare line breaks; pad each `<br>` so empty lines survive a save.
pub(crate) fn normalize_line_breaks(html: &str) -> String {
    match BR_TAG.as_ref() {
        Some(re) => re.replace_all(html, "&nbsp;<br>").into_owned(),
        None => html.to_string(),
    }
}

/// Title sent on save. An empty title only falls back to the placeholder when the
/// placeholder is one of the generated "New note" titles.
pub(crate) fn effective_title(value: &str, placeholder: &str) -> Option<String> {
    if !value.trim().is_empty() {
        return Some(value.to_string());
    }
    is_generated_title(placeholder).then(|| placeholder.to_string())
}

fn is_generated_title(title: &str) -> bool {
    DEFAULT_TITLE
        .as_ref()
        .is_some_and(|re| re.is_match(title))
}

/// `(value, placeholder)` of the title input for a loaded heading. Generated
/// "New note" headings stay out of the input and show as its placeholder.
pub(crate) fn title_fields(heading: &str) -> (String, String) {
    if heading.trim().is_empty() {
        return (String::new(), "New note".to_string());
    }
    if is_generated_title(heading) {
        (String::new(), heading.to_string())
    } else {
        (heading.to_string(), TITLE_PLACEHOLDER.to_string())
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

/// Text content of an HTML fragment, for the server's full-text column.
pub(crate) fn plain_text(html: &str) -> String {
    let stripped = match ANY_TAG.as_ref() {
        Some(re) => re.replace_all(html, "").into_owned(),
        None => html.to_string(),
    };
    stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// `history.pushState` to `url` (a query string or path) without reloading.
pub(crate) fn push_url(url: &str) {
    let Some(history) = web_sys::window().and_then(|w| w.history().ok()) else {
        return;
    };
    if history
        .push_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(url))
        .is_err()
    {
        log::warn!("history.pushState failed for {url}");
    }
}

/// Short random token for client-side placeholders.
pub(crate) fn random_token() -> String {
    let mut buf = [0u8; 6];
    if getrandom::getrandom(&mut buf).is_err() {
        return format!("{:x}", now_ms());
    }
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

pub(crate) fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_breaks_are_padded_in_every_spelling() {
        assert_eq!(
            normalize_line_breaks("a<br>b<BR/>c<br />"),
            "a&nbsp;<br>b&nbsp;<br>c&nbsp;<br>"
        );
    }

    #[test]
    fn empty_title_uses_generated_placeholder_only() {
        assert_eq!(effective_title("", "New note (3)").as_deref(), Some("New note (3)"));
        assert_eq!(effective_title("", "Nouvelle note").as_deref(), Some("Nouvelle note"));
        assert_eq!(effective_title("  ", "Type a title"), None);
        assert_eq!(effective_title("Groceries", "New note").as_deref(), Some("Groceries"));
    }

    #[test]
    fn generated_headings_become_the_placeholder() {
        assert_eq!(title_fields("New note (2)"), (String::new(), "New note (2)".to_string()));
        assert_eq!(title_fields("Neue Notiz"), (String::new(), "Neue Notiz".to_string()));
        assert_eq!(title_fields(""), (String::new(), "New note".to_string()));
        assert_eq!(title_fields("Groceries"), ("Groceries".to_string(), "Title ?".to_string()));
    }

    #[test]
    fn cleared_custom_title_is_not_saved() {
        let (_, placeholder) = title_fields("Groceries");
        assert_eq!(effective_title("", &placeholder), None);

        let (value, placeholder) = title_fields("New note (4)");
        assert_eq!(effective_title(&value, &placeholder).as_deref(), Some("New note (4)"));
    }

    #[test]
    fn plain_text_drops_tags_and_decodes_entities() {
        assert_eq!(plain_text("<p>a&nbsp;<b>b</b> &amp; c</p>"), "a b & c");
    }

    #[test]
    fn escape_html_covers_quotes() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#039;&amp;&#039;&lt;/a&gt;");
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
