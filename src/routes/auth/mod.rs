mod handler;
mod model;

pub use handler::{current_session, login, logout};
