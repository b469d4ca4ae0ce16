mod handler;
mod model;

pub use handler::{create_page, delete_page, get_page, get_page_by_slug, list_pages, update_page};
pub use model::Page;
