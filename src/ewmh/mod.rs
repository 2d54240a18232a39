pub mod atoms;
pub mod setup;
