//! Slash-command menu.
//!
//! Typing `/` at the start of a word opens a menu of insertions. The menu nests
//! up to three levels (Table > rows > columns). [`SlashMenu`] owns the
//! navigation state; keyboard and mouse both end in [`SlashMenu::activate`].

use crate::util::escape_html;

pub(crate) const MAX_DEPTH: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EditorMode {
    /// contenteditable HTML note.
    Html,
    /// Plain textarea (markdown and task list notes).
    Markdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SlashAction {
    Heading(u8),
    BulletList,
    NumberedList,
    Checklist,
    Table { rows: u8, cols: u8 },
    Separator,
    CodeBlock,
    Quote,
    Bold,
    Italic,
    InlineCode,
    /// Opens the note picker instead of inserting markup.
    LinkToNote,
}

impl SlashAction {
    /// Markup to insert, wrapping `selection` where the action wraps text.
    /// `None` for actions that open a dialog.
    pub fn render(&self, mode: EditorMode, selection: &str) -> Option<String> {
        Some(match mode {
            EditorMode::Markdown => self.markdown(selection)?,
            EditorMode::Html => self.html(&escape_html(selection))?,
        })
    }

    fn markdown(&self, sel: &str) -> Option<String> {
        Some(match *self {
            Self::Heading(level) => format!("{} {sel}", "#".repeat(level.clamp(1, 6) as usize)),
            Self::BulletList => format!("- {sel}"),
            Self::NumberedList => format!("1. {sel}"),
            Self::Checklist => format!("- [ ] {sel}"),
            Self::Table { rows, cols } => markdown_table(rows, cols),
            Self::Separator => "\n---\n".to_string(),
            Self::CodeBlock => format!("```\n{sel}\n```"),
            Self::Quote => format!("> {sel}"),
            Self::Bold => format!("**{sel}**"),
            Self::Italic => format!("*{sel}*"),
            Self::InlineCode => format!("`{sel}`"),
            Self::LinkToNote => return None,
        })
    }

    fn html(&self, sel: &str) -> Option<String> {
        let body = if sel.is_empty() { "<br>" } else { sel };
        // Inline wrappers need a character for the caret to land in.
        let inline = if sel.is_empty() { "\u{200B}" } else { sel };
        Some(match *self {
            Self::Heading(level) => {
                let l = level.clamp(1, 6);
                format!("<h{l}>{body}</h{l}>")
            }
            Self::BulletList => format!("<ul><li>{body}</li></ul>"),
            Self::NumberedList => format!("<ol><li>{body}</li></ol>"),
            Self::Checklist => format!(
                r#"<ul class="checklist"><li><input type="checkbox"> {body}</li></ul>"#
            ),
            Self::Table { rows, cols } => html_table(rows, cols),
            Self::Separator => "<hr><p><br></p>".to_string(),
            Self::CodeBlock => format!("<pre><code>{body}</code></pre>"),
            Self::Quote => format!("<blockquote>{body}</blockquote>"),
            Self::Bold => format!("<strong>{inline}</strong>"),
            Self::Italic => format!("<em>{inline}</em>"),
            Self::InlineCode => format!("<code>{inline}</code>"),
            Self::LinkToNote => return None,
        })
    }
}

fn markdown_table(rows: u8, cols: u8) -> String {
    let cols = cols.max(1) as usize;
    let row = format!("|{}\n", "     |".repeat(cols));
    let mut out = format!("\n{row}|{}\n", " --- |".repeat(cols));
    for _ in 1..rows.max(1) {
        out.push_str(&row);
    }
    out
}

fn html_table(rows: u8, cols: u8) -> String {
    let cell = |tag: &str| format!("<{tag}><br></{tag}>");
    let row = |tag: &str| format!("<tr>{}</tr>", cell(tag).repeat(cols.max(1) as usize));
    let mut out = format!(r#"<table class="inserted-table"><thead>{}</thead><tbody>"#, row("th"));
    for _ in 1..rows.max(1) {
        out.push_str(&row("td"));
    }
    out.push_str("</tbody></table><p><br></p>");
    out
}

/// Reference to another note, inserted by the note picker.
pub(crate) fn note_link(mode: EditorMode, note_id: &str, title: &str) -> String {
    match mode {
        EditorMode::Markdown => format!("[{title}](index.php?note={note_id})"),
        EditorMode::Html => format!(
            r#"<a href="index.php?note={note_id}" class="note-reference" data-note-id="{note_id}">{}</a>&nbsp;"#,
            escape_html(title)
        ),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SlashItem {
    pub id: String,
    pub label: String,
    pub action: Option<SlashAction>,
    pub children: Vec<SlashItem>,
}

impl SlashItem {
    fn leaf(id: impl Into<String>, label: impl Into<String>, action: SlashAction) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            action: Some(action),
            children: vec![],
        }
    }

    fn group(id: impl Into<String>, label: impl Into<String>, children: Vec<SlashItem>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            action: None,
            children,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

pub(crate) fn catalog() -> Vec<SlashItem> {
    let headings = (1..=6)
        .map(|l| SlashItem::leaf(format!("h{l}"), format!("Heading {l}"), SlashAction::Heading(l)))
        .collect();
    let tables = (2..=5)
        .map(|rows| {
            let cols = (2..=5)
                .map(|cols| {
                    SlashItem::leaf(
                        format!("table-{rows}x{cols}"),
                        format!("{cols} columns"),
                        SlashAction::Table { rows, cols },
                    )
                })
                .collect();
            SlashItem::group(format!("table-{rows}"), format!("{rows} rows"), cols)
        })
        .collect();

    vec![
        SlashItem::group("title", "Title", headings),
        SlashItem::leaf("bullet-list", "Bullet list", SlashAction::BulletList),
        SlashItem::leaf("numbered-list", "Numbered list", SlashAction::NumberedList),
        SlashItem::group("table", "Table", tables),
        SlashItem::leaf("checklist", "Checklist", SlashAction::Checklist),
        SlashItem::leaf("separator", "Separator", SlashAction::Separator),
        SlashItem::leaf("code-block", "Code block", SlashAction::CodeBlock),
        SlashItem::leaf("quote", "Quote", SlashAction::Quote),
        SlashItem::leaf("bold", "Bold", SlashAction::Bold),
        SlashItem::leaf("italic", "Italic", SlashAction::Italic),
        SlashItem::leaf("inline-code", "Inline code", SlashAction::InlineCode),
        SlashItem::leaf("note-reference", "Link to note", SlashAction::LinkToNote),
    ]
}

/// Top-level items whose label matches, then deeper items whose own label
/// matches under a non-matching parent, labelled with their full path.
pub(crate) fn filter_items(catalog: &[SlashItem], filter: &str) -> Vec<SlashItem> {
    let needle = filter.trim().to_lowercase();
    if needle.is_empty() {
        return catalog.to_vec();
    }

    fn walk(item: &SlashItem, path: &str, needle: &str, out: &mut Vec<SlashItem>) {
        let label = if path.is_empty() {
            item.label.clone()
        } else {
            format!("{path} › {}", item.label)
        };
        if item.label.to_lowercase().contains(needle) {
            out.push(SlashItem {
                label,
                ..item.clone()
            });
            return;
        }
        for child in &item.children {
            walk(child, &label, needle, out);
        }
    }

    let mut out = vec![];
    for item in catalog {
        walk(item, "", &needle, &mut out);
    }
    out
}

/// `Some(filter)` when the text before the caret ends in an open slash
/// command: a `/` at the start or after whitespace, followed by non-space text.
pub(crate) fn active_filter(text_before_caret: &str) -> Option<&str> {
    let slash = text_before_caret.rfind('/')?;
    let before = &text_before_caret[..slash];
    let after = &text_before_caret[slash + 1..];
    let at_word_start = before.chars().next_back().is_none_or(char::is_whitespace);
    (at_word_start && !after.chars().any(char::is_whitespace)).then_some(after)
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Level {
    items: Vec<SlashItem>,
    selected: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SlashOutcome {
    /// The menu handled the key; keep it from the editor.
    Handled,
    /// Not a menu key; let the editor have it.
    Passthrough,
    Close,
    /// Remove the `/filter` text, close the menu and run the action.
    Execute(SlashAction),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SlashMenu {
    catalog: Vec<SlashItem>,
    filter: String,
    levels: Vec<Level>,
}

impl SlashMenu {
    pub fn open(catalog: Vec<SlashItem>) -> Self {
        let items = catalog.clone();
        Self {
            catalog,
            filter: String::new(),
            levels: vec![Level { items, selected: 0 }],
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn items(&self, depth: usize) -> &[SlashItem] {
        self.levels.get(depth).map(|l| l.items.as_slice()).unwrap_or(&[])
    }

    pub fn selected(&self, depth: usize) -> Option<usize> {
        self.levels.get(depth).map(|l| l.selected)
    }

    /// Re-filters the top level and closes any open submenu.
    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
        self.levels = vec![Level {
            items: filter_items(&self.catalog, filter),
            selected: 0,
        }];
    }

    fn close_below(&mut self, depth: usize) {
        self.levels.truncate(depth + 1);
    }

    fn open_child(&mut self, depth: usize, index: usize) -> bool {
        let Some(item) = self.levels.get(depth).and_then(|l| l.items.get(index)) else {
            return false;
        };
        if !item.has_children() || depth + 1 >= MAX_DEPTH {
            return false;
        }
        let items = item.children.clone();
        self.close_below(depth);
        self.levels.push(Level { items, selected: 0 });
        true
    }

    fn select(&mut self, depth: usize, index: usize) -> bool {
        match self.levels.get_mut(depth) {
            Some(level) if index < level.items.len() => {
                level.selected = index;
                true
            }
            _ => false,
        }
    }

    /// Mouse hover: select the item and show its submenu, if any.
    pub fn hover(&mut self, depth: usize, index: usize) {
        if !self.select(depth, index) {
            return;
        }
        if !self.open_child(depth, index) {
            self.close_below(depth);
        }
    }

    /// Single entry point for Enter and click: opens a submenu or executes a leaf.
    pub fn activate(&mut self, depth: usize, index: usize) -> SlashOutcome {
        if !self.select(depth, index) {
            return SlashOutcome::Handled;
        }
        if self.open_child(depth, index) {
            return SlashOutcome::Handled;
        }
        match self.levels[depth].items[index].action {
            Some(action) => SlashOutcome::Execute(action),
            None => SlashOutcome::Handled,
        }
    }

    fn step(&mut self, forward: bool) {
        let depth = self.depth() - 1;
        let level = &mut self.levels[depth];
        let n = level.items.len();
        if n == 0 {
            return;
        }
        level.selected = if forward {
            (level.selected + 1) % n
        } else {
            (level.selected + n - 1) % n
        };
        self.close_below(depth);
    }

    pub fn handle_key(&mut self, key: &str) -> SlashOutcome {
        let depth = self.depth() - 1;
        match key {
            "ArrowDown" => {
                self.step(true);
                SlashOutcome::Handled
            }
            "ArrowUp" => {
                self.step(false);
                SlashOutcome::Handled
            }
            "ArrowRight" => {
                let sel = self.levels[depth].selected;
                self.open_child(depth, sel);
                SlashOutcome::Handled
            }
            "ArrowLeft" if depth > 0 => {
                self.levels.pop();
                SlashOutcome::Handled
            }
            "Escape" if depth > 0 => {
                self.levels.pop();
                SlashOutcome::Handled
            }
            "Escape" | " " => SlashOutcome::Close,
            "Enter" => {
                if self.levels[depth].items.is_empty() {
                    return SlashOutcome::Handled;
                }
                let sel = self.levels[depth].selected;
                self.activate(depth, sel)
            }
            "Backspace" if self.filter.is_empty() => SlashOutcome::Close,
            _ => SlashOutcome::Passthrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn menu() -> SlashMenu {
        SlashMenu::open(catalog())
    }

    #[test]
    fn trigger_requires_word_start() {
        assert_eq!(active_filter("/"), Some(""));
        assert_eq!(active_filter("hello /he"), Some("he"));
        assert_eq!(active_filter("a/b"), None);
        assert_eq!(active_filter("/he llo"), None);
        assert_eq!(active_filter("no slash"), None);
    }

    #[test]
    fn filter_matches_nested_labels() {
        let items = filter_items(&catalog(), "heading 3");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "Title › Heading 3");
        assert_eq!(items[0].action, Some(SlashAction::Heading(3)));
    }

    #[test]
    fn parent_match_keeps_children() {
        let items = filter_items(&catalog(), "TIT");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].children.len(), 6);
    }

    #[test]
    fn arrows_wrap_and_enter_opens_submenu() {
        let mut m = menu();
        assert_eq!(m.handle_key("ArrowUp"), SlashOutcome::Handled);
        assert_eq!(m.selected(0), Some(m.items(0).len() - 1));
        m.handle_key("ArrowDown");
        assert_eq!(m.selected(0), Some(0));

        assert_eq!(m.handle_key("Enter"), SlashOutcome::Handled);
        assert_eq!(m.depth(), 2);
        m.handle_key("ArrowDown");
        assert_eq!(m.handle_key("Enter"), SlashOutcome::Execute(SlashAction::Heading(2)));
    }

    #[test]
    fn table_uses_three_levels() {
        let mut m = menu();
        let table = m.items(0).iter().position(|i| i.id == "table").expect("table");
        m.hover(0, table);
        assert_eq!(m.depth(), 2);
        m.handle_key("ArrowDown");
        m.handle_key("ArrowRight");
        assert_eq!(m.depth(), 3);
        m.handle_key("ArrowDown");
        m.handle_key("ArrowDown");
        assert_eq!(
            m.handle_key("Enter"),
            SlashOutcome::Execute(SlashAction::Table { rows: 3, cols: 4 })
        );
    }

    #[test]
    fn left_and_escape_close_one_level_at_a_time() {
        let mut m = menu();
        m.activate(0, 0);
        assert_eq!(m.depth(), 2);
        assert_eq!(m.handle_key("ArrowLeft"), SlashOutcome::Handled);
        assert_eq!(m.depth(), 1);
        assert_eq!(m.handle_key("ArrowLeft"), SlashOutcome::Passthrough);
        m.activate(0, 0);
        assert_eq!(m.handle_key("Escape"), SlashOutcome::Handled);
        assert_eq!(m.handle_key("Escape"), SlashOutcome::Close);
    }

    #[test]
    fn click_on_leaf_executes() {
        let mut m = menu();
        let sep = m.items(0).iter().position(|i| i.id == "separator").expect("sep");
        assert_eq!(m.activate(0, sep), SlashOutcome::Execute(SlashAction::Separator));
    }

    #[test]
    fn hovering_leaf_closes_open_submenu() {
        let mut m = menu();
        m.hover(0, 0);
        assert_eq!(m.depth(), 2);
        m.hover(0, 1);
        assert_eq!(m.depth(), 1);
    }

    #[test]
    fn empty_filter_backspace_closes() {
        let mut m = menu();
        assert_eq!(m.handle_key("Backspace"), SlashOutcome::Close);
        m.set_filter("bo");
        assert_eq!(m.handle_key("Backspace"), SlashOutcome::Passthrough);
        assert_eq!(m.items(0)[0].id, "bold");
    }

    #[test]
    fn markup_follows_editor_mode() {
        let h = SlashAction::Heading(2);
        assert_eq!(h.render(EditorMode::Markdown, "Intro").as_deref(), Some("## Intro"));
        assert_eq!(h.render(EditorMode::Html, "").as_deref(), Some("<h2><br></h2>"));
        assert_eq!(
            SlashAction::Bold.render(EditorMode::Html, "<b>").as_deref(),
            Some("<strong>&lt;b&gt;</strong>")
        );
        assert_eq!(SlashAction::LinkToNote.render(EditorMode::Html, ""), None);
    }

    #[test]
    fn markdown_table_has_header_separator() {
        let t = SlashAction::Table { rows: 2, cols: 2 }
            .render(EditorMode::Markdown, "")
            .expect("table");
        assert_eq!(t, "\n|     |     |\n| --- | --- |\n|     |     |\n");
    }

    #[test]
    fn note_link_escapes_title() {
        assert_eq!(
            note_link(EditorMode::Markdown, "9", "Plan"),
            "[Plan](index.php?note=9)"
        );
        assert!(note_link(EditorMode::Html, "9", "A&B").contains(">A&amp;B</a>"));
    }
}
