mod handler;
mod model;

pub use handler::{create_slide, delete_slide, get_slide, list_slides, update_slide};
pub use model::Slide;
