/// Ordered, case-insensitively unique tag list backing a note's space-delimited tags field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TagSet {
    tags: Vec<String>,
}

fn split_tags(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

/// Tag equality ignoring case, Unicode-aware.
pub(crate) fn same_tag(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl TagSet {
    pub fn parse(field: &str) -> Self {
        let mut set = Self::default();
        for t in split_tags(field) {
            set.add(t);
        }
        set
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| same_tag(t, tag))
    }

    /// Adds every tag in `input` (it may hold several). Returns whether anything was added.
    pub fn add(&mut self, input: &str) -> bool {
        let mut added = false;
        for t in split_tags(input) {
            if !self.contains(t) {
                self.tags.push(t.to_string());
                added = true;
            }
        }
        added
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| !same_tag(t, tag));
        self.tags.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Value written back to the note's tags field.
    pub fn to_field(&self) -> String {
        self.tags.join(" ")
    }
}

/// Known tags starting with `prefix` that the note does not carry yet.
pub(crate) fn suggest_tags<'a>(
    known: &'a [String],
    current: &TagSet,
    prefix: &str,
    limit: usize,
) -> Vec<&'a str> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        return vec![];
    }
    known
        .iter()
        .map(String::as_str)
        .filter(|t| t.to_lowercase().starts_with(&prefix) && !current.contains(t))
        .take(limit)
        .collect()
}

/// New `tags_search` value after clicking a tag chip: the tag toggles in or out.
pub(crate) fn toggle_tag_search(current: &str, tag: &str) -> String {
    let mut set = TagSet::parse(current);
    if !set.remove(tag) {
        set.add(tag);
    }
    set.to_field()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn adding_tags_preserves_order_and_joins_with_spaces() {
        let mut set = TagSet::default();
        set.add("a");
        set.add("b");
        assert_eq!(set.to_field(), "a b");
    }

    #[test]
    fn duplicates_are_dropped_case_insensitively() {
        let mut set = TagSet::parse("Work home");
        assert!(!set.add("work"));
        assert!(set.add("HOME urgent"));
        assert_eq!(set.to_field(), "Work home urgent");
    }

    #[test]
    fn non_ascii_duplicates_are_dropped() {
        let mut set = TagSet::default();
        assert!(set.add("Été"));
        assert!(!set.add("été"));
        assert!(!set.add("ÉTÉ"));
        assert_eq!(set.to_field(), "Été");
        assert!(set.remove("été"));
        assert!(set.is_empty());
    }

    #[test]
    fn parse_accepts_commas_and_extra_whitespace() {
        let set = TagSet::parse("  a,b ,, c\td ");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn remove_matches_any_case() {
        let mut set = TagSet::parse("Rust wasm");
        assert!(set.remove("rust"));
        assert!(!set.remove("rust"));
        assert_eq!(set.to_field(), "wasm");
    }

    #[test]
    fn suggestions_skip_present_tags() {
        let known = vec!["rust".to_string(), "ruby".to_string(), "react".to_string()];
        let current = TagSet::parse("Ruby");
        assert_eq!(suggest_tags(&known, &current, "ru", 10), vec!["rust"]);
        assert!(suggest_tags(&known, &current, " ", 10).is_empty());
    }

    #[test]
    fn tag_search_toggles() {
        assert_eq!(toggle_tag_search("", "todo"), "todo");
        assert_eq!(toggle_tag_search("todo work", "TODO"), "work");
        assert_eq!(toggle_tag_search("work", "todo"), "work todo");
    }
}
