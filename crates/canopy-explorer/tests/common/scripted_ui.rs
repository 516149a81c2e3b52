//! An [`Interaction`] that answers prompts from a script and records every toast.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use canopy_explorer::{Interaction, NotifyLevel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Input(String),
    PickOne(String, Vec<String>),
    PickMany(String, Vec<String>),
    Confirm(String),
}

#[derive(Default)]
pub struct ScriptedInteraction {
    inputs: Mutex<VecDeque<Option<String>>>,
    picks: Mutex<VecDeque<Option<Vec<String>>>>,
    confirms: Mutex<VecDeque<bool>>,
    /// Every prompt shown, in order.
    pub prompts: Mutex<Vec<Prompt>>,
    /// Every notification, in order.
    pub notifications: Mutex<Vec<(NotifyLevel, String)>>,
}

impl ScriptedInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_input(self, answer: Option<&str>) -> Self {
        self.inputs
            .lock()
            .unwrap()
            .push_back(answer.map(str::to_owned));
        self
    }

    pub fn answer_pick(self, answer: Option<Vec<&str>>) -> Self {
        self.picks
            .lock()
            .unwrap()
            .push_back(answer.map(|picked| picked.into_iter().map(str::to_owned).collect()));
        self
    }

    pub fn answer_confirm(self, answer: bool) -> Self {
        self.confirms.lock().unwrap().push_back(answer);
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<(NotifyLevel, String)> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl Interaction for ScriptedInteraction {
    async fn input(&self, prompt: &str, _placeholder: &str) -> Option<String> {
        self.prompts
            .lock()
            .unwrap()
            .push(Prompt::Input(prompt.to_owned()));
        self.inputs.lock().unwrap().pop_front().flatten()
    }

    async fn pick_one(&self, title: &str, options: Vec<String>) -> Option<String> {
        self.prompts
            .lock()
            .unwrap()
            .push(Prompt::PickOne(title.to_owned(), options));
        self.picks
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .and_then(|picked| picked.into_iter().next())
    }

    async fn pick_many(&self, title: &str, options: Vec<String>) -> Option<Vec<String>> {
        self.prompts
            .lock()
            .unwrap()
            .push(Prompt::PickMany(title.to_owned(), options));
        self.picks.lock().unwrap().pop_front().flatten()
    }

    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts
            .lock()
            .unwrap()
            .push(Prompt::Confirm(prompt.to_owned()));
        self.confirms.lock().unwrap().pop_front().unwrap_or(false)
    }

    fn notify(&self, level: NotifyLevel, message: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((level, message.to_owned()));
    }
}
