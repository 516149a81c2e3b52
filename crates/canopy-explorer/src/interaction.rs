//! Collaborators supplied by the presentation layer.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

/// User prompts and toasts.
///
/// Every prompt resolves to `None` (or `false`) when the user dismisses it; callers
/// treat that as a normal cancellation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Interaction: Send + Sync {
    async fn input(&self, prompt: &str, placeholder: &str) -> Option<String>;
    async fn pick_one(&self, title: &str, options: Vec<String>) -> Option<String>;
    async fn pick_many(&self, title: &str, options: Vec<String>) -> Option<Vec<String>>;
    async fn confirm(&self, prompt: &str) -> bool;
    fn notify(&self, level: NotifyLevel, message: &str);
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write(&self, text: &str) -> std::io::Result<()>;
}
