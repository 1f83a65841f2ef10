use crate::models::Note;
use crate::tags::TagSet;
use crate::util::plain_text;
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

pub(crate) const HIGHLIGHT_CLASS: &str = "search-highlight";

static HIGHLIGHT_SPAN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"<span class="search-highlight">([^<]*)</span>"#).ok()
});

static HTML_ENTITY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);").ok()
});

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum SearchMode {
    Notes(Vec<String>),
    Tags(Vec<String>),
    #[default]
    None,
}

/// Which search the sidebar bar is set to when the URL carries none.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum SearchBarKind {
    #[default]
    Notes,
    Tags,
}

fn terms(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

impl SearchMode {
    /// URL parameters win (`tags_search` before `search`); the bar state is the fallback.
    pub fn detect(
        url_search: Option<&str>,
        url_tags_search: Option<&str>,
        bar_query: &str,
        bar_kind: SearchBarKind,
    ) -> Self {
        if let Some(t) = url_tags_search.map(terms).filter(|t| !t.is_empty()) {
            return Self::Tags(t);
        }
        if let Some(t) = url_search.map(terms).filter(|t| !t.is_empty()) {
            return Self::Notes(t);
        }
        let t = terms(bar_query);
        if t.is_empty() {
            return Self::None;
        }
        match bar_kind {
            SearchBarKind::Notes => Self::Notes(t),
            SearchBarKind::Tags => Self::Tags(t),
        }
    }

    pub fn note_terms(&self) -> &[String] {
        match self {
            Self::Notes(t) => t,
            _ => &[],
        }
    }

    pub fn tag_terms(&self) -> &[String] {
        match self {
            Self::Tags(t) => t,
            _ => &[],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Segment {
    pub text: String,
    pub highlighted: bool,
}

fn terms_regex(terms: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = terms
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| regex::escape(t))
        .collect();
    if alternatives.is_empty() {
        return None;
    }
    RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into alternating plain and matching runs.
pub(crate) fn highlight_segments(text: &str, terms: &[String]) -> Vec<Segment> {
    let Some(re) = terms_regex(terms) else {
        return vec![Segment {
            text: text.to_string(),
            highlighted: false,
        }];
    };

    let mut out = vec![];
    let mut last = 0;
    for m in re.find_iter(text) {
        if m.start() > last {
            out.push(Segment {
                text: text[last..m.start()].to_string(),
                highlighted: false,
            });
        }
        out.push(Segment {
            text: m.as_str().to_string(),
            highlighted: true,
        });
        last = m.end();
    }
    if last < text.len() || out.is_empty() {
        out.push(Segment {
            text: text[last..].to_string(),
            highlighted: false,
        });
    }
    out
}

fn mark_matches(text: &str, re: &Regex, out: &mut String) {
    out.push_str(&re.replace_all(text, |c: &regex::Captures| {
        format!(r#"<span class="{HIGHLIGHT_CLASS}">{}</span>"#, &c[0])
    }));
}

/// Highlights one text run. Entities such as `&amp;` pass through untouched.
fn mark_text_run(text: &str, re: &Regex, out: &mut String) {
    let Some(entity) = HTML_ENTITY.as_ref() else {
        mark_matches(text, re, out);
        return;
    };
    let mut last = 0;
    for m in entity.find_iter(text) {
        mark_matches(&text[last..m.start()], re, out);
        out.push_str(m.as_str());
        last = m.end();
    }
    mark_matches(&text[last..], re, out);
}

/// Wraps matches in text runs of `html` (never inside tags) with highlight spans.
pub(crate) fn highlight_html(html: &str, terms: &[String]) -> String {
    let Some(re) = terms_regex(terms) else {
        return html.to_string();
    };

    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while !rest.is_empty() {
        let text_end = rest.find('<').unwrap_or(rest.len());
        let (text, tail) = rest.split_at(text_end);
        mark_text_run(text, &re, &mut out);
        let tag_end = tail.find('>').map(|i| i + 1).unwrap_or(tail.len());
        out.push_str(&tail[..tag_end]);
        rest = &tail[tag_end..];
    }
    out
}

/// Removes highlight spans, nested ones included, so they never reach the server.
pub(crate) fn strip_highlights(html: &str) -> String {
    let Some(re) = HIGHLIGHT_SPAN.as_ref() else {
        return html.to_string();
    };
    let mut out = html.to_string();
    loop {
        let next = re.replace_all(&out, "$1").into_owned();
        if next == out {
            return out;
        }
        out = next;
    }
}

/// Sidebar filter: every term must appear in the title or text (notes search),
/// or every tag term must be one of the note's tags (tags search).
pub(crate) fn matches_search(note: &Note, mode: &SearchMode) -> bool {
    match mode {
        SearchMode::None => true,
        SearchMode::Notes(terms) => {
            let haystack = format!("{} {}", note.heading, plain_text(&note.content)).to_lowercase();
            terms.iter().all(|t| haystack.contains(&t.to_lowercase()))
        }
        SearchMode::Tags(terms) => {
            let tags = TagSet::parse(&note.tags);
            terms.iter().all(|t| tags.contains(t))
        }
    }
}

fn search_url(param: &str, value: &str, workspace: &str) -> String {
    let mut pairs = vec![];
    if !value.trim().is_empty() {
        pairs.push(format!("{param}={}", urlencoding::encode(value.trim())));
    }
    if !workspace.is_empty() {
        pairs.push(format!("workspace={}", urlencoding::encode(workspace)));
    }
    format!("?{}", pairs.join("&"))
}

/// Query string for a tag search, keeping only the workspace.
pub(crate) fn tag_search_query(tags_search: &str, workspace: &str) -> String {
    search_url("tags_search", tags_search, workspace)
}

/// Query string for a search-bar submit.
pub(crate) fn bar_search_query(kind: SearchBarKind, query: &str, workspace: &str) -> String {
    match kind {
        SearchBarKind::Notes => search_url("search", query, workspace),
        SearchBarKind::Tags => tag_search_query(query, workspace),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn url_tags_take_precedence() {
        let mode = SearchMode::detect(Some("report"), Some("work"), "", SearchBarKind::Notes);
        assert_eq!(mode, SearchMode::Tags(t(&["work"])));
    }

    #[test]
    fn bar_state_is_fallback() {
        assert_eq!(
            SearchMode::detect(None, Some("  "), "budget q3", SearchBarKind::Notes),
            SearchMode::Notes(t(&["budget", "q3"]))
        );
        assert_eq!(
            SearchMode::detect(None, None, "", SearchBarKind::Tags),
            SearchMode::None
        );
    }

    #[test]
    fn segments_match_case_insensitively() {
        let segs = highlight_segments("Rust and rUST", &t(&["rust"]));
        let marked: Vec<_> = segs.iter().filter(|s| s.highlighted).map(|s| s.text.as_str()).collect();
        assert_eq!(marked, vec!["Rust", "rUST"]);
        assert_eq!(segs.iter().map(|s| s.text.as_str()).collect::<String>(), "Rust and rUST");
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let segs = highlight_segments("cost (usd)", &t(&["(usd)"]));
        assert_eq!(segs.last().map(|s| s.highlighted), Some(true));
    }

    #[test]
    fn html_tags_are_not_highlighted() {
        let html = r#"<p class="note">note text</p>"#;
        assert_eq!(
            highlight_html(html, &t(&["note"])),
            r#"<p class="note"><span class="search-highlight">note</span> text</p>"#
        );
    }

    #[test]
    fn strip_undoes_highlight() {
        let html = "<p>Hello world</p>";
        let marked = highlight_html(html, &t(&["hello", "world"]));
        assert_ne!(marked, html);
        assert_eq!(strip_highlights(&marked), html);
    }

    #[test]
    fn entities_are_never_split() {
        assert_eq!(
            highlight_html("<p>Tom &amp; Jerry</p>", &t(&["amp"])),
            "<p>Tom &amp; Jerry</p>"
        );
        assert_eq!(
            highlight_html("<p>a&nbsp;camp&#160;x</p>", &t(&["amp", "nbsp"])),
            r#"<p>a&nbsp;c<span class="search-highlight">amp</span>&#160;x</p>"#
        );
    }

    #[test]
    fn nested_highlights_are_fully_stripped() {
        let html = "<p>Budget</p>";
        let twice = highlight_html(&highlight_html(html, &t(&["budget"])), &t(&["budget"]));
        assert!(twice.matches(HIGHLIGHT_CLASS).count() >= 2);
        assert_eq!(strip_highlights(&twice), html);
    }

    #[test]
    fn tag_search_needs_every_tag() {
        let note = Note {
            heading: "Plan".into(),
            tags: "work urgent".into(),
            content: "<p>Quarterly <b>budget</b></p>".into(),
            ..Default::default()
        };
        assert!(matches_search(&note, &SearchMode::Tags(t(&["WORK"]))));
        assert!(!matches_search(&note, &SearchMode::Tags(t(&["work", "home"]))));
        assert!(matches_search(&note, &SearchMode::Notes(t(&["plan", "budget"]))));
        assert!(!matches_search(&note, &SearchMode::Notes(t(&["p>"]))));
    }

    #[test]
    fn tag_search_query_keeps_workspace_only() {
        assert_eq!(tag_search_query("a b", "Poznote"), "?tags_search=a%20b&workspace=Poznote");
        assert_eq!(tag_search_query(" ", "Poznote"), "?workspace=Poznote");
    }

    #[test]
    fn bar_search_uses_the_param_of_its_kind() {
        assert_eq!(
            bar_search_query(SearchBarKind::Notes, "meeting", "Work"),
            "?search=meeting&workspace=Work"
        );
        assert_eq!(
            bar_search_query(SearchBarKind::Tags, "urgent", ""),
            "?tags_search=urgent"
        );
    }
}
