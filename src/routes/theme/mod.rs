mod handler;
mod model;

pub use handler::{get_theme, update_theme};
pub use model::ThemeSettings;
