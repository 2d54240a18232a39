pub mod context;
pub mod cookie;
pub mod error;
