pub mod alert;
pub mod badge;
pub mod button;
pub mod dialog;
pub mod input;
pub mod menu;
pub mod spinner;

// Re-export component symbols so callers can `use crate::components::ui::Button` etc.
pub use alert::*;
pub use badge::*;
pub use button::*;
pub use dialog::*;
pub use input::*;
pub use menu::*;
pub use spinner::*;
