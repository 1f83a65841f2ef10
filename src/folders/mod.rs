use crate::models::{Folder, SystemFolder};
use std::collections::{HashMap, HashSet};

/// Parent/child index over the flat folder list of one workspace.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct FolderTree {
    by_id: HashMap<String, Folder>,
    children: HashMap<Option<String>, Vec<String>>,
}

impl FolderTree {
    pub fn build(folders: &[Folder]) -> Self {
        let by_id: HashMap<String, Folder> = folders
            .iter()
            .map(|f| (f.id.clone(), f.clone()))
            .collect();

        let mut children: HashMap<Option<String>, Vec<String>> = HashMap::new();
        for f in folders {
            // A parent missing from the list makes the folder a root.
            let parent = f
                .parent_id
                .clone()
                .filter(|p| by_id.contains_key(p) && p != &f.id);
            children.entry(parent).or_default().push(f.id.clone());
        }
        for ids in children.values_mut() {
            ids.sort_by_key(|id| {
                by_id
                    .get(id)
                    .map(|f| f.name.to_lowercase())
                    .unwrap_or_default()
            });
        }

        Self { by_id, children }
    }

    pub fn get(&self, id: &str) -> Option<&Folder> {
        self.by_id.get(id)
    }

    pub fn roots(&self) -> Vec<&Folder> {
        self.children_of(None)
    }

    pub fn children_of(&self, parent: Option<&str>) -> Vec<&Folder> {
        self.children
            .get(&parent.map(str::to_string))
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Ancestor ids from the direct parent up to the root. Stops on cycles.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out = vec![];
        let mut seen = HashSet::from([id.to_string()]);
        let mut cur = self.by_id.get(id).and_then(|f| f.parent_id.clone());
        while let Some(pid) = cur {
            if !seen.insert(pid.clone()) || !self.by_id.contains_key(&pid) {
                break;
            }
            cur = self.by_id.get(&pid).and_then(|f| f.parent_id.clone());
            out.push(pid);
        }
        out
    }

    /// Whether `candidate` sits somewhere below `ancestor`.
    pub fn is_descendant(&self, candidate: &str, ancestor: &str) -> bool {
        self.ancestors(candidate).iter().any(|a| a == ancestor)
    }

    /// `Parent/Child` display path.
    pub fn path(&self, id: &str) -> String {
        let Some(folder) = self.by_id.get(id) else {
            return String::new();
        };
        let mut parts: Vec<&str> = self
            .ancestors(id)
            .iter()
            .rev()
            .filter_map(|a| self.by_id.get(a).map(|f| f.name.as_str()))
            .collect();
        parts.push(&folder.name);
        parts.join("/")
    }

    pub fn is_system(&self, id: &str) -> bool {
        self.by_id
            .get(id)
            .is_some_and(|f| SystemFolder::from_name(&f.name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str, name: &str, parent: Option<&str>) -> Folder {
        Folder {
            id: id.into(),
            name: name.into(),
            parent_id: parent.map(str::to_string),
            path: None,
        }
    }

    fn sample() -> FolderTree {
        FolderTree::build(&[
            folder("1", "Work", None),
            folder("2", "Projects", Some("1")),
            folder("3", "Rust", Some("2")),
            folder("4", "archive", None),
            folder("5", "Orphan", Some("99")),
        ])
    }

    #[test]
    fn roots_are_sorted_and_include_orphans() {
        let tree = sample();
        let names: Vec<_> = tree.roots().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["archive", "Orphan", "Work"]);
    }

    #[test]
    fn descendant_check_walks_all_levels() {
        let tree = sample();
        assert!(tree.is_descendant("3", "1"));
        assert!(tree.is_descendant("2", "1"));
        assert!(!tree.is_descendant("1", "3"));
        assert!(!tree.is_descendant("1", "1"));
    }

    #[test]
    fn path_joins_names() {
        assert_eq!(sample().path("3"), "Work/Projects/Rust");
        assert_eq!(sample().path("missing"), "");
    }

    #[test]
    fn cycles_terminate() {
        let tree = FolderTree::build(&[folder("a", "A", Some("b")), folder("b", "B", Some("a"))]);
        assert_eq!(tree.ancestors("a"), vec!["b".to_string()]);
        assert!(tree.is_descendant("a", "b"));
    }
}
