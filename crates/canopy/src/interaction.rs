use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use canopy_explorer::{Interaction, NotifyLevel};

use crate::event::{AppEvent, Event};
use crate::prompt::PromptRequest;

/// Routes explorer prompts and toasts to the event loop.
#[derive(Debug, Clone)]
pub struct TuiInteraction {
    events: mpsc::UnboundedSender<Event>,
}

impl TuiInteraction {
    pub fn new(events: mpsc::UnboundedSender<Event>) -> Self {
        TuiInteraction { events }
    }

    fn post(&self, event: AppEvent) {
        if self.events.send(Event::App(event)).is_err() {
            tracing::debug!("Event loop gone, dropping UI request");
        }
    }
}

#[async_trait]
impl Interaction for TuiInteraction {
    async fn input(&self, prompt: &str, placeholder: &str) -> Option<String> {
        let (reply, answer) = oneshot::channel();
        self.post(AppEvent::Prompt(PromptRequest::Input {
            prompt: prompt.to_owned(),
            placeholder: placeholder.to_owned(),
            reply,
        }));
        answer.await.ok().flatten()
    }

    async fn pick_one(&self, title: &str, options: Vec<String>) -> Option<String> {
        let (reply, answer) = oneshot::channel();
        self.post(AppEvent::Prompt(PromptRequest::PickOne {
            title: title.to_owned(),
            options,
            reply,
        }));
        answer.await.ok().flatten()
    }

    async fn pick_many(&self, title: &str, options: Vec<String>) -> Option<Vec<String>> {
        let (reply, answer) = oneshot::channel();
        self.post(AppEvent::Prompt(PromptRequest::PickMany {
            title: title.to_owned(),
            options,
            reply,
        }));
        answer.await.ok().flatten()
    }

    async fn confirm(&self, prompt: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        self.post(AppEvent::Prompt(PromptRequest::Confirm {
            prompt: prompt.to_owned(),
            reply,
        }));
        answer.await.unwrap_or(false)
    }

    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => tracing::info!("{}", message),
            NotifyLevel::Warning => tracing::warn!("{}", message),
            NotifyLevel::Error => tracing::error!("{}", message),
        }
        self.post(AppEvent::Toast(level, message.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prompts_round_trip_through_the_event_queue() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ui = TuiInteraction::new(tx);

        let asking = tokio::spawn(async move { ui.input("Name?", "local").await });
        match rx.recv().await {
            Some(Event::App(AppEvent::Prompt(PromptRequest::Input {
                prompt,
                placeholder,
                reply,
            }))) => {
                assert_eq!(prompt, "Name?");
                assert_eq!(placeholder, "local");
                reply.send(Some("dev".to_owned())).unwrap();
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(asking.await.unwrap(), Some("dev".to_owned()));
    }

    #[tokio::test]
    async fn dropped_prompt_counts_as_dismissal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ui = TuiInteraction::new(tx);

        let asking = tokio::spawn(async move { ui.confirm("Sure?").await });
        drop(rx.recv().await);
        assert!(!asking.await.unwrap());
    }

    #[tokio::test]
    async fn closed_loop_resolves_immediately() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let ui = TuiInteraction::new(tx);
        assert_eq!(ui.pick_one("x", vec!["a".to_owned()]).await, None);
        ui.notify(NotifyLevel::Info, "nobody listens");
    }

    #[tokio::test]
    async fn notify_posts_a_toast() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ui = TuiInteraction::new(tx);
        ui.notify(NotifyLevel::Warning, "Got null value of key.");
        assert!(matches!(
            rx.recv().await,
            Some(Event::App(AppEvent::Toast(NotifyLevel::Warning, message)))
                if message == "Got null value of key."
        ));
    }
}
