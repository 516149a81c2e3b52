pub mod app;
pub mod clipboard;
pub mod constants;
pub mod draw;
pub mod event;
pub mod interaction;
pub mod namespace;
pub mod prompt;
pub mod settings;
pub mod sync;
pub mod tracing;
pub mod tree_view;
