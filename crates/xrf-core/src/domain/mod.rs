pub mod errors;

pub use errors::{XrfError, XrfErrorCategory, XrfResult};
