//! Modal prompts raised by explorers and answered from the keyboard.

use std::collections::BTreeSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use tokio::sync::oneshot;

/// A question waiting for the user. Dropping the reply sender counts as a dismissal.
#[derive(Debug)]
pub enum PromptRequest {
    Input {
        prompt: String,
        placeholder: String,
        reply: oneshot::Sender<Option<String>>,
    },
    PickOne {
        title: String,
        options: Vec<String>,
        reply: oneshot::Sender<Option<String>>,
    },
    PickMany {
        title: String,
        options: Vec<String>,
        reply: oneshot::Sender<Option<Vec<String>>>,
    },
    Confirm {
        prompt: String,
        reply: oneshot::Sender<bool>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStatus {
    Open,
    Closed,
}

/// Ranks `options` against `query`, best match first. An empty query keeps the order.
pub fn fuzzy_filter(query: &str, options: &[String]) -> Vec<usize> {
    if query.trim().is_empty() {
        return (0..options.len()).collect();
    }
    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);
    let mut buf = Vec::new();
    let mut scored: Vec<(usize, u32)> = options
        .iter()
        .enumerate()
        .filter_map(|(idx, option)| {
            pattern
                .score(Utf32Str::new(option, &mut buf), &mut matcher)
                .map(|score| (idx, score))
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.into_iter().map(|(idx, _)| idx).collect()
}

/// The prompt currently on screen.
#[derive(Debug)]
pub struct Prompt {
    request: Option<PromptRequest>,
    pub query: String,
    pub filtered: Vec<usize>,
    pub cursor: usize,
    pub marked: BTreeSet<usize>,
}

impl Prompt {
    pub fn new(request: PromptRequest) -> Self {
        let filtered = match &request {
            PromptRequest::PickOne { options, .. } | PromptRequest::PickMany { options, .. } => {
                (0..options.len()).collect()
            }
            _ => Vec::new(),
        };
        Prompt {
            request: Some(request),
            query: String::new(),
            filtered,
            cursor: 0,
            marked: BTreeSet::new(),
        }
    }

    pub fn title(&self) -> &str {
        match &self.request {
            Some(PromptRequest::Input { prompt, .. }) => prompt,
            Some(PromptRequest::PickOne { title, .. }) => title,
            Some(PromptRequest::PickMany { title, .. }) => title,
            Some(PromptRequest::Confirm { prompt, .. }) => prompt,
            None => "",
        }
    }

    pub fn placeholder(&self) -> &str {
        match &self.request {
            Some(PromptRequest::Input { placeholder, .. }) => placeholder,
            _ => "",
        }
    }

    pub fn options(&self) -> &[String] {
        match &self.request {
            Some(PromptRequest::PickOne { options, .. })
            | Some(PromptRequest::PickMany { options, .. }) => options,
            _ => &[],
        }
    }

    pub fn is_pick(&self) -> bool {
        matches!(
            self.request,
            Some(PromptRequest::PickOne { .. }) | Some(PromptRequest::PickMany { .. })
        )
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.request, Some(PromptRequest::PickMany { .. }))
    }

    pub fn is_confirm(&self) -> bool {
        matches!(self.request, Some(PromptRequest::Confirm { .. }))
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PromptStatus {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.dismiss();
        }
        if self.is_confirm() {
            return match key.code {
                KeyCode::Char('y' | 'Y') => self.answer_confirm(true),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => self.answer_confirm(false),
                _ => PromptStatus::Open,
            };
        }

        match key.code {
            KeyCode::Esc => self.dismiss(),
            KeyCode::Enter => self.submit(),
            KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                PromptStatus::Open
            }
            KeyCode::Down => {
                if self.cursor + 1 < self.filtered.len() {
                    self.cursor += 1;
                }
                PromptStatus::Open
            }
            KeyCode::Tab if self.is_multi() => {
                if let Some(&idx) = self.filtered.get(self.cursor) {
                    if !self.marked.remove(&idx) {
                        self.marked.insert(idx);
                    }
                }
                PromptStatus::Open
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.refilter();
                PromptStatus::Open
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                self.refilter();
                PromptStatus::Open
            }
            _ => PromptStatus::Open,
        }
    }

    fn refilter(&mut self) {
        if self.is_pick() {
            self.filtered = fuzzy_filter(&self.query, self.options());
            self.cursor = 0;
        }
    }

    fn submit(&mut self) -> PromptStatus {
        let highlighted = self.filtered.get(self.cursor).copied();
        match self.request.take() {
            Some(PromptRequest::Input { reply, .. }) => {
                let _ = reply.send(Some(self.query.clone()));
            }
            Some(PromptRequest::PickOne { options, reply, .. }) => {
                let picked = highlighted.and_then(|idx| options.get(idx).cloned());
                let _ = reply.send(picked);
            }
            Some(PromptRequest::PickMany { options, reply, .. }) => {
                let picked = self
                    .marked
                    .iter()
                    .filter_map(|idx| options.get(*idx).cloned())
                    .collect();
                let _ = reply.send(Some(picked));
            }
            // Only an explicit `y` confirms.
            request @ Some(PromptRequest::Confirm { .. }) => {
                self.request = request;
                return PromptStatus::Open;
            }
            None => {}
        }
        PromptStatus::Closed
    }

    fn answer_confirm(&mut self, answer: bool) -> PromptStatus {
        if let Some(PromptRequest::Confirm { reply, .. }) = self.request.take() {
            let _ = reply.send(answer);
        }
        PromptStatus::Closed
    }

    fn dismiss(&mut self) -> PromptStatus {
        match self.request.take() {
            Some(PromptRequest::Input { reply, .. }) | Some(PromptRequest::PickOne { reply, .. }) => {
                let _ = reply.send(None);
            }
            Some(PromptRequest::PickMany { reply, .. }) => {
                let _ = reply.send(None);
            }
            Some(PromptRequest::Confirm { reply, .. }) => {
                let _ = reply.send(false);
            }
            None => {}
        }
        PromptStatus::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(prompt: &mut Prompt, text: &str) {
        for c in text.chars() {
            assert_eq!(prompt.handle_key(key(KeyCode::Char(c))), PromptStatus::Open);
        }
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn fuzzy_filter_ranks_and_drops() {
        let options = names(&["kube-system", "default", "payments", "kube-public"]);
        assert_eq!(fuzzy_filter("", &options), vec![0, 1, 2, 3]);

        let hits = fuzzy_filter("kube", &options);
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&0) && hits.contains(&3));
        assert_eq!(fuzzy_filter("PAY", &options), vec![2]);
        assert!(fuzzy_filter("zzz", &options).is_empty());
    }

    #[tokio::test]
    async fn input_returns_typed_text() {
        let (reply, rx) = oneshot::channel();
        let mut prompt = Prompt::new(PromptRequest::Input {
            prompt: "Please specify the cluster name:".to_owned(),
            placeholder: "e.g. local".to_owned(),
            reply,
        });
        type_text(&mut prompt, "locx");
        prompt.handle_key(key(KeyCode::Backspace));
        type_text(&mut prompt, "al");

        assert_eq!(prompt.handle_key(key(KeyCode::Enter)), PromptStatus::Closed);
        assert_eq!(rx.await.unwrap(), Some("local".to_owned()));
    }

    #[tokio::test]
    async fn escape_dismisses_input() {
        let (reply, rx) = oneshot::channel();
        let mut prompt = Prompt::new(PromptRequest::Input {
            prompt: "name".to_owned(),
            placeholder: String::new(),
            reply,
        });
        type_text(&mut prompt, "abc");
        assert_eq!(prompt.handle_key(key(KeyCode::Esc)), PromptStatus::Closed);
        assert_eq!(rx.await.unwrap(), None);
    }

    #[tokio::test]
    async fn pick_one_follows_the_filter() {
        let (reply, rx) = oneshot::channel();
        let mut prompt = Prompt::new(PromptRequest::PickOne {
            title: "What namespace do you want to use?".to_owned(),
            options: names(&["namespace/default", "namespace/payments"]),
            reply,
        });
        type_text(&mut prompt, "pay");
        assert_eq!(prompt.filtered, vec![1]);
        prompt.handle_key(key(KeyCode::Enter));
        assert_eq!(rx.await.unwrap(), Some("namespace/payments".to_owned()));
    }

    #[tokio::test]
    async fn pick_one_with_no_match_resolves_none() {
        let (reply, rx) = oneshot::channel();
        let mut prompt = Prompt::new(PromptRequest::PickOne {
            title: "pick".to_owned(),
            options: names(&["a"]),
            reply,
        });
        type_text(&mut prompt, "zz");
        prompt.handle_key(key(KeyCode::Enter));
        assert_eq!(rx.await.unwrap(), None);
    }

    #[tokio::test]
    async fn pick_many_returns_marked_in_option_order() {
        let (reply, rx) = oneshot::channel();
        let mut prompt = Prompt::new(PromptRequest::PickMany {
            title: "Please select clusters you want to remove:".to_owned(),
            options: names(&["a", "b", "c"]),
            reply,
        });
        prompt.handle_key(key(KeyCode::Down));
        prompt.handle_key(key(KeyCode::Down));
        prompt.handle_key(key(KeyCode::Tab));
        prompt.handle_key(key(KeyCode::Up));
        prompt.handle_key(key(KeyCode::Up));
        prompt.handle_key(key(KeyCode::Tab));
        prompt.handle_key(key(KeyCode::Down));
        prompt.handle_key(key(KeyCode::Tab));
        prompt.handle_key(key(KeyCode::Tab));

        assert_eq!(prompt.handle_key(key(KeyCode::Enter)), PromptStatus::Closed);
        assert_eq!(rx.await.unwrap(), Some(names(&["a", "c"])));
    }

    #[tokio::test]
    async fn confirm_answers() {
        for (code, expected) in [
            (KeyCode::Char('y'), true),
            (KeyCode::Char('n'), false),
            (KeyCode::Esc, false),
        ] {
            let (reply, rx) = oneshot::channel();
            let mut prompt = Prompt::new(PromptRequest::Confirm {
                prompt: "Are you sure?".to_owned(),
                reply,
            });
            assert_eq!(prompt.handle_key(key(KeyCode::Char('x'))), PromptStatus::Open);
            assert_eq!(prompt.handle_key(key(code)), PromptStatus::Closed);
            assert_eq!(rx.await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn enter_does_not_confirm() {
        let (reply, mut rx) = oneshot::channel();
        let mut prompt = Prompt::new(PromptRequest::Confirm {
            prompt: "Remove 2 clusters?".to_owned(),
            reply,
        });

        assert_eq!(prompt.handle_key(key(KeyCode::Enter)), PromptStatus::Open);
        assert!(prompt.is_confirm());
        assert!(rx.try_recv().is_err());

        assert_eq!(prompt.handle_key(key(KeyCode::Esc)), PromptStatus::Closed);
        assert!(!rx.await.unwrap());
    }
}
