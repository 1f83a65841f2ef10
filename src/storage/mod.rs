use crate::models::RecentFolder;
use crate::util::now_ms;
use serde::{Deserialize, Serialize};

pub(crate) const SELECTED_WORKSPACE_KEY: &str = "poznote_selected_workspace";
pub(crate) const RECENT_FOLDERS_KEY: &str = "poznote_recent_folders";

const MAX_RECENT_FOLDERS: usize = 5;

pub(crate) fn folder_state_key(folder_id: &str) -> String {
    format!("folder_{folder_id}")
}

pub(crate) fn folder_search_key(folder_name: &str) -> String {
    format!("folder_search_{folder_name}")
}

/// String key/value persistence. `localStorage` in the browser; an in-memory map in tests.
pub(crate) trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LocalStorage;

impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|w| w.local_storage().ok().flatten())
    }
}

impl KvStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = Self::storage() {
            // Quota errors are not fatal: the server copy is still authoritative.
            if storage.set_item(key, value).is_err() {
                log::warn!("localStorage write failed for {key}");
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

pub(crate) fn load_json<T: for<'de> Deserialize<'de>>(store: &impl KvStore, key: &str) -> Option<T> {
    let json = store.get(key)?;
    serde_json::from_str(&json).ok()
}

pub(crate) fn save_json<T: Serialize>(store: &impl KvStore, key: &str, value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        store.set(key, &json);
    }
}

pub(crate) fn upsert_lru_by_key<T: Clone>(
    mut items: Vec<T>,
    item: T,
    same_key: impl Fn(&T, &T) -> bool,
    max: usize,
) -> Vec<T> {
    items.retain(|x| !same_key(x, &item));
    items.insert(0, item);
    if items.len() > max {
        items.truncate(max);
    }
    items
}

pub(crate) fn load_selected_workspace(store: &impl KvStore) -> Option<String> {
    store
        .get(SELECTED_WORKSPACE_KEY)
        .filter(|s| !s.trim().is_empty())
}

pub(crate) fn save_selected_workspace(store: &impl KvStore, workspace: &str) {
    store.set(SELECTED_WORKSPACE_KEY, workspace);
}

pub(crate) fn load_recent_folders(store: &impl KvStore) -> Vec<RecentFolder> {
    load_json::<Vec<RecentFolder>>(store, RECENT_FOLDERS_KEY).unwrap_or_default()
}

pub(crate) fn write_recent_folder(store: &impl KvStore, id: &str, name: &str) {
    if id.trim().is_empty() {
        return;
    }
    let item = RecentFolder {
        id: id.to_string(),
        name: name.to_string(),
        last_opened_ms: now_ms(),
    };
    let next = upsert_lru_by_key(
        load_recent_folders(store),
        item,
        |a, b| a.id == b.id,
        MAX_RECENT_FOLDERS,
    );
    save_json(store, RECENT_FOLDERS_KEY, &next);
}

/// Folders default to collapsed; `"open"` is the only expanded marker.
pub(crate) fn is_folder_expanded(store: &impl KvStore, folder_id: &str) -> bool {
    store.get(&folder_state_key(folder_id)).as_deref() == Some("open")
}

pub(crate) fn set_folder_expanded(store: &impl KvStore, folder_id: &str, expanded: bool) {
    store.set(
        &folder_state_key(folder_id),
        if expanded { "open" } else { "closed" },
    );
}

pub(crate) fn load_folder_search(store: &impl KvStore, folder_name: &str) -> Option<String> {
    store.get(&folder_search_key(folder_name))
}

pub(crate) fn save_folder_search(store: &impl KvStore, folder_name: &str, query: &str) {
    if query.trim().is_empty() {
        store.remove(&folder_search_key(folder_name));
    } else {
        store.set(&folder_search_key(folder_name), query);
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::KvStore;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub items: RefCell<HashMap<String, String>>,
    }

    impl KvStore for MemoryStore {
        fn get(&self, key: &str) -> Option<String> {
            self.items.borrow().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) {
            self.items
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
        }

        fn remove(&self, key: &str) {
            self.items.borrow_mut().remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[test]
    fn lru_moves_existing_item_to_front_and_truncates() {
        let items = vec![1, 2, 3];
        assert_eq!(upsert_lru_by_key(items, 3, |a, b| a == b, 3), vec![3, 1, 2]);
        assert_eq!(upsert_lru_by_key(vec![1, 2, 3], 4, |a, b| a == b, 3), vec![4, 1, 2]);
    }

    #[test]
    fn folder_state_defaults_to_collapsed() {
        let store = MemoryStore::default();
        assert!(!is_folder_expanded(&store, "12"));
        set_folder_expanded(&store, "12", true);
        assert!(is_folder_expanded(&store, "12"));
        assert_eq!(store.get("folder_12").as_deref(), Some("open"));
        set_folder_expanded(&store, "12", false);
        assert!(!is_folder_expanded(&store, "12"));
    }

    #[test]
    fn blank_workspace_is_treated_as_unset() {
        let store = MemoryStore::default();
        save_selected_workspace(&store, "  ");
        assert_eq!(load_selected_workspace(&store), None);
        save_selected_workspace(&store, "Poznote");
        assert_eq!(load_selected_workspace(&store).as_deref(), Some("Poznote"));
    }

    #[test]
    fn empty_folder_search_clears_key() {
        let store = MemoryStore::default();
        save_folder_search(&store, "Work", "budget");
        assert_eq!(load_folder_search(&store, "Work").as_deref(), Some("budget"));
        save_folder_search(&store, "Work", "");
        assert_eq!(load_folder_search(&store, "Work"), None);
    }
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn local_storage_roundtrip() {
        let store = LocalStorage;
        store.remove(SELECTED_WORKSPACE_KEY);
        assert_eq!(load_selected_workspace(&store), None);

        save_selected_workspace(&store, "Work");
        assert_eq!(load_selected_workspace(&store).as_deref(), Some("Work"));

        store.remove(SELECTED_WORKSPACE_KEY);
    }

    #[wasm_bindgen_test]
    fn recent_folders_are_capped() {
        let store = LocalStorage;
        store.remove(RECENT_FOLDERS_KEY);
        for i in 0..8 {
            write_recent_folder(&store, &i.to_string(), &format!("F{i}"));
        }
        let recents = load_recent_folders(&store);
        assert_eq!(recents.len(), 5);
        assert_eq!(recents[0].id, "7");
        store.remove(RECENT_FOLDERS_KEY);
    }
}
