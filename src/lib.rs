pub mod aggregate;
pub mod config;
pub mod error;
pub mod github;
pub mod issues;
pub mod layout;
pub mod palette;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod studio;
#[doc(hidden)]
pub mod test_support;
pub mod theme;
