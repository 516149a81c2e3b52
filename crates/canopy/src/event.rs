use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::eyre;
use crossterm::event::{Event as CrosstermEvent, EventStream};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};

use canopy_explorer::{Document, NotifyLevel, TreeNode};

use crate::prompt::PromptRequest;

#[derive(Debug)]
pub enum Event {
    Tick,
    Crossterm(CrosstermEvent),
    App(AppEvent),
}

/// Results of background work, addressed to a tab by index.
#[derive(Debug)]
pub enum AppEvent {
    Prompt(PromptRequest),
    Toast(NotifyLevel, String),
    Roots {
        tab: usize,
        nodes: Vec<TreeNode>,
    },
    Children {
        tab: usize,
        row: u64,
        nodes: Vec<TreeNode>,
    },
    /// `None` marks the whole tree stale.
    Stale {
        tab: usize,
        node: Option<TreeNode>,
    },
    Preview {
        title: String,
        document: Document,
    },
    Quit,
}

/// Merges terminal input, a steady tick and application events into one queue.
#[derive(Debug)]
pub struct EventHandler {
    sender: mpsc::UnboundedSender<Event>,
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(terminal_events(sender.clone(), tick_rate));
        EventHandler { sender, receiver }
    }

    /// Handler without the terminal reader, fed only through [`EventHandler::sender`].
    pub fn detached() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        EventHandler { sender, receiver }
    }

    pub async fn next(&mut self) -> Result<Event> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| eyre!("event channel closed"))
    }

    pub fn send(&self, event: AppEvent) {
        // The receiver lives as long as self.
        let _ = self.sender.send(Event::App(event));
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.sender.clone()
    }
}

async fn terminal_events(sender: mpsc::UnboundedSender<Event>, tick_rate: Duration) {
    let mut reader = EventStream::new();
    let mut ticker = interval(tick_rate);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            _ = sender.closed() => break,
            _ = ticker.tick() => Event::Tick,
            maybe_event = reader.next() => match maybe_event {
                Some(Ok(event)) => Event::Crossterm(event),
                Some(Err(err)) => {
                    tracing::error!("Terminal event error: {}", err);
                    continue;
                }
                None => break,
            },
        };
        if sender.send(event).is_err() {
            break;
        }
    }
    tracing::debug!("Terminal event reader stopped");
}
