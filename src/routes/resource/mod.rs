pub mod handler;
pub mod model;

pub use handler::{batch_request, get_resource};
