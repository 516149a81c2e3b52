use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio::sync::broadcast::error::RecvError;

use canopy_explorer::{
    Clipboard, Document, Explorer, Interaction, NotifyLevel, RemovalOutcome, Session, TreeNode,
    TreeSource,
};
use canopy_k8s_backend::NamespaceSwitch;
use canopy_sqlite_backend::{StateStore, StateStoreExt};

use crate::constants::{LAST_TAB_KEY, TOAST_TICKS};
use crate::event::{AppEvent, Event, EventHandler};
use crate::namespace::switch_namespace;
use crate::prompt::{Prompt, PromptStatus};
use crate::tree_view::TreeView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    Normal,
    Prompt,
    Preview,
}

pub struct Tab {
    pub explorer: Arc<Explorer>,
    pub view: TreeView<TreeNode>,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub level: NotifyLevel,
    pub message: String,
    ticks_left: u8,
}

#[derive(Debug, Clone)]
pub struct Preview {
    pub title: String,
    pub document: Document,
    pub scroll: u16,
}

/// Application.
pub struct Canopy {
    pub running: bool,
    pub tabs: Vec<Tab>,
    pub active: usize,
    pub events: EventHandler,
    pub prompts: VecDeque<Prompt>,
    pub toast: Option<Toast>,
    pub preview: Option<Preview>,
    pub last_refreshed_at: Option<String>,
    session: Arc<Session>,
    store: Arc<dyn StateStore>,
    ui: Arc<dyn Interaction>,
    clipboard: Arc<dyn Clipboard>,
    kubeconfig: Option<PathBuf>,
}

/// Long-lived collaborators shared by every tab.
pub struct Services {
    pub session: Arc<Session>,
    pub store: Arc<dyn StateStore>,
    pub ui: Arc<dyn Interaction>,
    pub clipboard: Arc<dyn Clipboard>,
    pub kubeconfig: Option<PathBuf>,
}

impl Canopy {
    pub fn new(events: EventHandler, explorers: Vec<Arc<Explorer>>, services: Services) -> Self {
        let tabs = explorers
            .into_iter()
            .map(|explorer| Tab {
                explorer,
                view: TreeView::new(),
            })
            .collect();
        Canopy {
            running: true,
            tabs,
            active: 0,
            events,
            prompts: VecDeque::new(),
            toast: None,
            preview: None,
            last_refreshed_at: None,
            session: services.session,
            store: services.store,
            ui: services.ui,
            clipboard: services.clipboard,
            kubeconfig: services.kubeconfig,
        }
    }

    pub fn mode(&self) -> InteractionMode {
        if !self.prompts.is_empty() {
            InteractionMode::Prompt
        } else if self.preview.is_some() {
            InteractionMode::Preview
        } else {
            InteractionMode::Normal
        }
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.get(self.active)
    }

    /// Run the application's main loop.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> color_eyre::Result<()> {
        self.restore_tab().await;
        self.start();

        while self.running {
            terminal.draw(|frame| self.draw(frame))?;
            let event = self.events.next().await?;
            self.handle_event(event);
        }
        self.remember_tab().await;
        tracing::info!("Canopy session {} finished", self.session.id());
        Ok(())
    }

    /// Reopens the tab that was active when the previous session ended.
    pub async fn restore_tab(&mut self) {
        let title = match self.store.get_json::<String>(LAST_TAB_KEY.to_owned()).await {
            Ok(title) => title,
            Err(err) => {
                tracing::warn!("Unable to read the last active tab: {:#}", err);
                None
            }
        };
        if let Some(idx) = title.and_then(|title| {
            self.tabs
                .iter()
                .position(|tab| tab.explorer.title() == title)
        }) {
            self.active = idx;
        }
    }

    pub async fn remember_tab(&self) {
        let Some(tab) = self.active_tab() else {
            return;
        };
        let title = tab.explorer.title().to_owned();
        if let Err(err) = self.store.set_json(LAST_TAB_KEY.to_owned(), &title).await {
            tracing::warn!("Unable to remember the active tab: {:#}", err);
        }
    }

    /// Subscribes to every explorer's stale notifications and lists the first tab.
    pub fn start(&mut self) {
        for (tab, entry) in self.tabs.iter().enumerate() {
            let mut stale = entry.explorer.subscribe();
            let sender = self.events.sender();
            tokio::spawn(async move {
                loop {
                    let node = match stale.recv().await {
                        Ok(node) => node,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!("Refresh listener lagged by {}", skipped);
                            None
                        }
                        Err(RecvError::Closed) => break,
                    };
                    if sender.send(Event::App(AppEvent::Stale { tab, node })).is_err() {
                        break;
                    }
                }
            });
        }
        if !self.tabs.is_empty() {
            self.load_roots(self.active);
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick => self.tick(),
            Event::Crossterm(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                self.handle_key_events(key)
            }
            Event::Crossterm(_) => {}
            Event::App(app_event) => self.handle_app_event(app_event),
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Prompt(request) => self.prompts.push_back(Prompt::new(request)),
            AppEvent::Toast(level, message) => self.show_toast(level, message),
            AppEvent::Roots { tab, nodes } => {
                if let Some(entry) = self.tabs.get_mut(tab) {
                    entry.view.set_roots(nodes);
                    self.last_refreshed_at = Some(Local::now().format("%H:%M:%S").to_string());
                }
            }
            AppEvent::Children { tab, row, nodes } => {
                if let Some(entry) = self.tabs.get_mut(tab) {
                    if !entry.view.set_children(row, nodes) {
                        tracing::debug!("Dropping children of a row that is gone");
                    }
                }
            }
            AppEvent::Stale { tab, node: None } => self.load_roots(tab),
            AppEvent::Stale {
                tab,
                node: Some(node),
            } => {
                let rows = match self.tabs.get(tab) {
                    Some(entry) => entry.view.expanded_matching(&node),
                    None => Vec::new(),
                };
                for row in rows {
                    self.load_children(tab, row, node.clone());
                }
            }
            AppEvent::Preview { title, document } => {
                if self.session.record_preview_shown() {
                    self.show_toast(
                        NotifyLevel::Info,
                        "Preview opened: arrows scroll, Esc closes".to_owned(),
                    );
                }
                self.preview = Some(Preview {
                    title,
                    document,
                    scroll: 0,
                });
            }
            AppEvent::Quit => self.quit(),
        }
    }

    /// Handles the key events and updates the state of [`Canopy`].
    pub fn handle_key_events(&mut self, key: KeyEvent) {
        if let Some(prompt) = self.prompts.front_mut() {
            if prompt.handle_key(key) == PromptStatus::Closed {
                self.prompts.pop_front();
            }
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.events.send(AppEvent::Quit);
            return;
        }
        if let Some(preview) = self.preview.as_mut() {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => self.preview = None,
                KeyCode::Down | KeyCode::Char('j') => {
                    preview.scroll = preview.scroll.saturating_add(1)
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    preview.scroll = preview.scroll.saturating_sub(1)
                }
                KeyCode::PageDown => preview.scroll = preview.scroll.saturating_add(20),
                KeyCode::PageUp => preview.scroll = preview.scroll.saturating_sub(20),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.events.send(AppEvent::Quit),
            KeyCode::Tab => self.switch_tab(1),
            KeyCode::BackTab => self.switch_tab(self.tabs.len().saturating_sub(1)),
            KeyCode::Down | KeyCode::Char('j') => self.with_view(TreeView::select_next),
            KeyCode::Up | KeyCode::Char('k') => self.with_view(TreeView::select_previous),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => self.open_selected(),
            KeyCode::Left | KeyCode::Char('h') => self.close_selected(),
            KeyCode::Char('a') => self.add_cluster(),
            KeyCode::Char('d') => self.remove_clusters(),
            KeyCode::Char('r') => {
                if let Some(tab) = self.active_tab() {
                    tab.explorer.refresh(None);
                }
            }
            KeyCode::Char('c') => self.copy_selected_path(),
            KeyCode::Char('n') => self.use_namespace(),
            _ => {}
        }
    }

    /// Counts down the visible toast.
    pub fn tick(&mut self) {
        if let Some(toast) = self.toast.as_mut() {
            toast.ticks_left = toast.ticks_left.saturating_sub(1);
            if toast.ticks_left == 0 {
                self.toast = None;
            }
        }
    }

    /// Set running to false to quit the application.
    pub fn quit(&mut self) {
        self.running = false;
    }

    fn show_toast(&mut self, level: NotifyLevel, message: String) {
        self.toast = Some(Toast {
            level,
            message,
            ticks_left: TOAST_TICKS,
        });
    }

    fn with_view(&mut self, f: impl FnOnce(&mut TreeView<TreeNode>)) {
        if let Some(tab) = self.tabs.get_mut(self.active) {
            f(&mut tab.view);
        }
    }

    fn switch_tab(&mut self, step: usize) {
        if self.tabs.is_empty() {
            return;
        }
        self.active = (self.active + step) % self.tabs.len();
        if !self.tabs[self.active].view.loaded {
            self.load_roots(self.active);
        }
    }

    fn selected_node(&self) -> Option<(Arc<Explorer>, TreeNode)> {
        let tab = self.active_tab()?;
        let row = tab.view.selected()?;
        Some((Arc::clone(&tab.explorer), row.node.clone()))
    }

    fn open_selected(&mut self) {
        let Some(tab) = self.tabs.get_mut(self.active) else {
            return;
        };
        let Some(row) = tab.view.selected() else {
            return;
        };
        let (id, node, expandable, expanded) =
            (row.id, row.node.clone(), row.is_expandable(), row.expanded);
        let activatable = row.item.activation.is_some();

        if expandable {
            if expanded {
                tab.view.collapse(id);
            } else if tab.view.mark_loading(id) {
                self.load_children(self.active, id, node);
            }
        } else if activatable {
            self.activate(node);
        }
    }

    fn close_selected(&mut self) {
        let Some(tab) = self.tabs.get_mut(self.active) else {
            return;
        };
        let Some(row) = tab.view.selected() else {
            return;
        };
        let id = row.id;
        if row.expanded {
            tab.view.collapse(id);
        } else if let Some(parent) = tab.view.parent_of(id) {
            tab.view.select_id(parent);
        }
    }

    fn load_roots(&self, tab: usize) {
        let Some(entry) = self.tabs.get(tab) else {
            return;
        };
        let explorer = Arc::clone(&entry.explorer);
        let sender = self.events.sender();
        tokio::spawn(async move {
            let nodes = explorer.get_children(None).await;
            let _ = sender.send(Event::App(AppEvent::Roots { tab, nodes }));
        });
    }

    fn load_children(&self, tab: usize, row: u64, node: TreeNode) {
        let Some(entry) = self.tabs.get(tab) else {
            return;
        };
        let explorer = Arc::clone(&entry.explorer);
        let sender = self.events.sender();
        tokio::spawn(async move {
            let nodes = explorer.get_children(Some(&node)).await;
            let _ = sender.send(Event::App(AppEvent::Children { tab, row, nodes }));
        });
    }

    fn activate(&self, node: TreeNode) {
        let Some(tab) = self.active_tab() else {
            return;
        };
        let explorer = Arc::clone(&tab.explorer);
        let sender = self.events.sender();
        tokio::spawn(async move {
            if let Some(document) = explorer.activate(&node).await {
                let title = node.path().to_owned();
                let _ = sender.send(Event::App(AppEvent::Preview { title, document }));
            }
        });
    }

    fn add_cluster(&self) {
        let Some(tab) = self.active_tab() else {
            return;
        };
        let explorer = Arc::clone(&tab.explorer);
        let ui = Arc::clone(&self.ui);
        tokio::spawn(async move {
            match explorer.add_cluster().await {
                Ok(Some(name)) => ui.notify(NotifyLevel::Info, &format!("Added cluster {name}")),
                Ok(None) => tracing::debug!("Adding a {} cluster was cancelled", explorer.title()),
                Err(err) => ui.notify(NotifyLevel::Error, &err.to_string()),
            }
        });
    }

    fn remove_clusters(&self) {
        let Some(tab) = self.active_tab() else {
            return;
        };
        let explorer = Arc::clone(&tab.explorer);
        let ui = Arc::clone(&self.ui);
        tokio::spawn(async move {
            match explorer.remove_clusters().await {
                Ok(RemovalOutcome::Removed(names)) => ui.notify(
                    NotifyLevel::Info,
                    &format!("Removed clusters: {}", names.join(", ")),
                ),
                Ok(_) => {}
                Err(err) => ui.notify(NotifyLevel::Error, &err.to_string()),
            }
        });
    }

    fn copy_selected_path(&self) {
        let Some((explorer, node)) = self.selected_node() else {
            return;
        };
        let clipboard = Arc::clone(&self.clipboard);
        tokio::spawn(async move {
            explorer.copy_path(&node, clipboard.as_ref()).await;
        });
    }

    fn use_namespace(&self) {
        let kubeconfig = self.kubeconfig.clone();
        let ui = Arc::clone(&self.ui);
        tokio::spawn(async move {
            match switch_namespace(kubeconfig.as_deref(), ui.as_ref()).await {
                Ok(NamespaceSwitch::Switched(ns)) => tracing::info!("Namespace is now {}", ns),
                Ok(_) => {}
                Err(err) => ui.notify(NotifyLevel::Error, &err.to_string()),
            }
        });
    }
}
