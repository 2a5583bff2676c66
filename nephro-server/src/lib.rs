pub mod http;
pub mod predict;
