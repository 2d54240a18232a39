pub mod client;
pub mod layout;
pub mod manager;
pub mod workspace;
