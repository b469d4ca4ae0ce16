mod handler;
mod model;

pub use handler::{create_product, delete_product, get_product, list_products, update_product};
pub use model::{Product, ProductFilter};
