// 业务流程
pub mod resource;

pub use resource::{fetch_batch, fetch_resource};
