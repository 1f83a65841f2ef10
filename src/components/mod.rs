pub mod attachments_panel;
pub mod confirm_dialog;
pub mod folder_tree;
pub mod note_list;
pub mod note_picker;
pub mod save_indicator;
pub mod share_dialog;
pub mod slash_menu;
pub mod tag_editor;
pub mod toasts;
pub mod ui;
