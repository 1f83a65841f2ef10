//! Drag-and-drop of notes and folders in the sidebar.
//!
//! `dataTransfer` is only readable on `drop`, so the payload of the drag in
//! progress lives in the app store from `dragstart` to `dragend`.
//! [`plan_drop`] decides what a drop does before any request is made.

use crate::folders::FolderTree;
use crate::models::SystemFolder;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DragPayload {
    Note {
        note_id: String,
        current_folder_id: Option<String>,
    },
    Folder {
        folder_id: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DropTarget {
    Folder { id: String, name: String },
    /// Outside any folder: notes leave their folder, folders move to the top level.
    Root,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DropAction {
    MoveNote { note_id: String, folder_id: String },
    RemoveNoteFromFolder { note_id: String },
    MoveFolder { folder_id: String, new_parent_id: Option<String> },
    ToggleFavorite { note_id: String },
    /// Asks for confirmation before deleting.
    TrashNote { note_id: String },
    /// Opens the public share dialog of the note; nothing is sent until it is confirmed there.
    ShareNote { note_id: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DropRejection {
    SameFolder,
    SystemFolder,
    IntoDescendant,
    AlreadyAtRoot,
}

impl DropRejection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::SameFolder => "Already in this folder",
            Self::SystemFolder => "System folders cannot take this item",
            Self::IntoDescendant => "A folder cannot move into its own subfolder",
            Self::AlreadyAtRoot => "Already at the top level",
        }
    }
}

/// System folders cannot be picked up.
pub(crate) fn can_drag_folder(name: &str) -> bool {
    SystemFolder::from_name(name).is_none()
}

pub(crate) fn plan_drop(
    payload: &DragPayload,
    target: &DropTarget,
    tree: &FolderTree,
) -> Result<DropAction, DropRejection> {
    match (payload, target) {
        (DragPayload::Folder { folder_id }, DropTarget::Folder { id, name }) => {
            if folder_id == id {
                return Err(DropRejection::SameFolder);
            }
            if SystemFolder::from_name(name).is_some() || tree.is_system(folder_id) {
                return Err(DropRejection::SystemFolder);
            }
            if tree.is_descendant(id, folder_id) {
                return Err(DropRejection::IntoDescendant);
            }
            Ok(DropAction::MoveFolder {
                folder_id: folder_id.clone(),
                new_parent_id: Some(id.clone()),
            })
        }
        (DragPayload::Folder { folder_id }, DropTarget::Root) => {
            if tree.is_system(folder_id) {
                return Err(DropRejection::SystemFolder);
            }
            let has_parent = tree.get(folder_id).is_some_and(|f| f.parent_id.is_some());
            if !has_parent {
                return Err(DropRejection::AlreadyAtRoot);
            }
            Ok(DropAction::MoveFolder {
                folder_id: folder_id.clone(),
                new_parent_id: None,
            })
        }
        (
            DragPayload::Note {
                note_id,
                current_folder_id,
            },
            DropTarget::Folder { id, name },
        ) => match SystemFolder::from_name(name) {
            Some(SystemFolder::Favorites) => Ok(DropAction::ToggleFavorite {
                note_id: note_id.clone(),
            }),
            Some(SystemFolder::Trash) => Ok(DropAction::TrashNote {
                note_id: note_id.clone(),
            }),
            Some(SystemFolder::Public) => Ok(DropAction::ShareNote {
                note_id: note_id.clone(),
            }),
            Some(SystemFolder::Tags) => Err(DropRejection::SystemFolder),
            None if current_folder_id.as_deref() == Some(id.as_str()) => {
                Err(DropRejection::SameFolder)
            }
            None => Ok(DropAction::MoveNote {
                note_id: note_id.clone(),
                folder_id: id.clone(),
            }),
        },
        (
            DragPayload::Note {
                note_id,
                current_folder_id,
            },
            DropTarget::Root,
        ) => match current_folder_id {
            Some(_) => Ok(DropAction::RemoveNoteFromFolder {
                note_id: note_id.clone(),
            }),
            None => Err(DropRejection::AlreadyAtRoot),
        },
    }
}

/// Whether a `dragover` on `target` should show the drop cursor.
pub(crate) fn accepts(payload: Option<&DragPayload>, target: &DropTarget, tree: &FolderTree) -> bool {
    payload.is_some_and(|p| plan_drop(p, target, tree).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Folder;
    use pretty_assertions::assert_eq;

    fn tree() -> FolderTree {
        let f = |id: &str, name: &str, parent: Option<&str>| Folder {
            id: id.into(),
            name: name.into(),
            parent_id: parent.map(str::to_string),
            path: None,
        };
        FolderTree::build(&[
            f("1", "Work", None),
            f("2", "Sub", Some("1")),
            f("3", "Deep", Some("2")),
            f("10", "Tags", None),
        ])
    }

    fn folder_target(id: &str, name: &str) -> DropTarget {
        DropTarget::Folder {
            id: id.into(),
            name: name.into(),
        }
    }

    fn dragged_folder(id: &str) -> DragPayload {
        DragPayload::Folder {
            folder_id: id.into(),
        }
    }

    fn dragged_note(id: &str, folder: Option<&str>) -> DragPayload {
        DragPayload::Note {
            note_id: id.into(),
            current_folder_id: folder.map(str::to_string),
        }
    }

    #[test]
    fn folder_onto_itself_is_rejected() {
        assert_eq!(
            plan_drop(&dragged_folder("1"), &folder_target("1", "Work"), &tree()),
            Err(DropRejection::SameFolder)
        );
    }

    #[test]
    fn folder_onto_system_folder_is_rejected() {
        assert_eq!(
            plan_drop(&dragged_folder("2"), &folder_target("10", "Tags"), &tree()),
            Err(DropRejection::SystemFolder)
        );
    }

    #[test]
    fn folder_onto_descendant_is_rejected() {
        assert_eq!(
            plan_drop(&dragged_folder("1"), &folder_target("3", "Deep"), &tree()),
            Err(DropRejection::IntoDescendant)
        );
    }

    #[test]
    fn folder_moves_under_unrelated_folder_and_to_root() {
        assert_eq!(
            plan_drop(&dragged_folder("3"), &folder_target("1", "Work"), &tree()),
            Ok(DropAction::MoveFolder {
                folder_id: "3".into(),
                new_parent_id: Some("1".into())
            })
        );
        assert_eq!(
            plan_drop(&dragged_folder("2"), &DropTarget::Root, &tree()),
            Ok(DropAction::MoveFolder {
                folder_id: "2".into(),
                new_parent_id: None
            })
        );
        assert_eq!(
            plan_drop(&dragged_folder("1"), &DropTarget::Root, &tree()),
            Err(DropRejection::AlreadyAtRoot)
        );
    }

    #[test]
    fn note_drops() {
        let t = tree();
        assert_eq!(
            plan_drop(&dragged_note("7", Some("1")), &folder_target("1", "Work"), &t),
            Err(DropRejection::SameFolder)
        );
        assert_eq!(
            plan_drop(&dragged_note("7", Some("1")), &folder_target("10", "Tags"), &t),
            Err(DropRejection::SystemFolder)
        );
        assert_eq!(
            plan_drop(&dragged_note("7", None), &folder_target("2", "Sub"), &t),
            Ok(DropAction::MoveNote {
                note_id: "7".into(),
                folder_id: "2".into()
            })
        );
        assert_eq!(
            plan_drop(&dragged_note("7", None), &folder_target("", "Favorites"), &t),
            Ok(DropAction::ToggleFavorite { note_id: "7".into() })
        );
        assert_eq!(
            plan_drop(&dragged_note("7", Some("1")), &folder_target("11", "Public"), &t),
            Ok(DropAction::ShareNote { note_id: "7".into() })
        );
        assert_eq!(
            plan_drop(&dragged_folder("2"), &folder_target("11", "Public"), &t),
            Err(DropRejection::SystemFolder)
        );
        assert_eq!(
            plan_drop(&dragged_note("7", Some("2")), &DropTarget::Root, &t),
            Ok(DropAction::RemoveNoteFromFolder { note_id: "7".into() })
        );
        assert_eq!(
            plan_drop(&dragged_note("7", None), &DropTarget::Root, &t),
            Err(DropRejection::AlreadyAtRoot)
        );
    }

    #[test]
    fn system_folders_cannot_be_dragged() {
        assert!(!can_drag_folder("Trash"));
        assert!(can_drag_folder("Trash bin"));
        assert!(!accepts(None, &DropTarget::Root, &tree()));
    }
}
