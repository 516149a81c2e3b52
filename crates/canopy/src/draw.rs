use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Clear, HighlightSpacing, List, ListItem, Paragraph, Tabs, Wrap},
};

use canopy_explorer::{NotifyLevel, TreeSource};

use crate::app::{Canopy, InteractionMode};
use crate::constants::CANOPY_VERSION;
use crate::prompt::Prompt;
use crate::tree_view::Row;

const KEY_HELP: &str =
    "enter open  a add  d remove  r refresh  c copy path  n namespace  tab next  q quit";

fn row_label<N: TreeSource>(row: &Row<N>) -> String {
    let marker = match (row.is_expandable(), row.expanded) {
        (false, _) => "  ",
        (true, false) => "+ ",
        (true, true) => "- ",
    };
    let loading = if row.loading { " ..." } else { "" };
    format!(
        "{}{}{}{}",
        "  ".repeat(row.depth),
        marker,
        row.item.label,
        loading
    )
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Percentage(width)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Percentage(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}

impl Canopy {
    pub fn draw(&mut self, f: &mut Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(1)
            .constraints([
                Constraint::Length(2), // header
                Constraint::Length(1), // tabs
                Constraint::Min(1),    // tree
                Constraint::Length(3), // status
            ])
            .split(f.area());

        self.draw_header(f, chunks[0]);
        self.draw_tabs(f, chunks[1]);
        self.draw_tree(f, chunks[2]);
        self.draw_status(f, chunks[3]);

        if let Some(preview) = &self.preview {
            let area = centered(f.area(), 80, 80);
            let title = format!(" {} ({}) ", preview.title, preview.document.language);
            let body = Paragraph::new(preview.document.content.as_str())
                .wrap(Wrap { trim: false })
                .scroll((preview.scroll, 0))
                .block(
                    Block::bordered()
                        .title(title)
                        .border_type(BorderType::Rounded),
                );
            f.render_widget(Clear, area);
            f.render_widget(body, area);
        }

        if let Some(prompt) = self.prompts.front() {
            draw_prompt(f, prompt);
        }
    }

    fn draw_header(&self, f: &mut Frame<'_>, area: Rect) {
        let [title_area, refresh_area] =
            Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
                .areas(area);

        let heading_style = Style::new()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::ITALIC | Modifier::BOLD);
        let title = Paragraph::new(Text::from(Span::styled(
            format!("Canopy v{}", CANOPY_VERSION),
            heading_style,
        )));
        f.render_widget(title, title_area);

        let refresh_style = Style::new().fg(Color::Gray).add_modifier(Modifier::ITALIC);
        let help_style = Style::new()
            .fg(Color::LightCyan)
            .add_modifier(Modifier::ITALIC);
        let refreshed = match &self.last_refreshed_at {
            Some(at) => format!("last refreshed at {at}"),
            None => "loading ...".to_owned(),
        };
        let text = vec![
            Line::styled(refreshed, refresh_style),
            Line::styled("press 'r' to refresh", help_style),
        ];
        f.render_widget(
            Paragraph::new(Text::from(text)).alignment(Alignment::Right),
            refresh_area,
        );
    }

    fn draw_tabs(&self, f: &mut Frame<'_>, area: Rect) {
        let titles = self.tabs.iter().map(|tab| tab.explorer.title());
        let tabs = Tabs::new(titles)
            .select(self.active)
            .style(Style::new().fg(Color::Gray))
            .highlight_style(Style::new().fg(Color::Cyan).bold());
        f.render_widget(tabs, area);
    }

    fn draw_tree(&mut self, f: &mut Frame<'_>, area: Rect) {
        let Some(tab) = self.tabs.get_mut(self.active) else {
            f.render_widget(
                Paragraph::new("No explorers enabled in settings.json").italic(),
                area,
            );
            return;
        };

        let block = Block::bordered()
            .title(format!(" {} ", tab.explorer.title()))
            .title_alignment(Alignment::Center)
            .border_type(BorderType::Rounded);

        if tab.view.loaded && tab.view.rows().is_empty() {
            let hint = Paragraph::new("Nothing here yet: press 'a' to add a cluster")
                .italic()
                .block(block);
            f.render_widget(hint, area);
            return;
        }

        let items: Vec<ListItem> = tab
            .view
            .rows()
            .iter()
            .map(|row| ListItem::new(row_label(row)))
            .collect();
        let list = List::new(items)
            .block(block)
            .style(Style::new().fg(Color::Magenta))
            .highlight_style(Style::default().bold().white().on_black())
            .highlight_spacing(HighlightSpacing::Always);
        f.render_stateful_widget(list, area, &mut tab.view.list_state);
    }

    fn draw_status(&self, f: &mut Frame<'_>, area: Rect) {
        let (mode, col) = match self.mode() {
            InteractionMode::Normal => ("NORMAL", Color::White),
            InteractionMode::Prompt => ("PROMPT", Color::Cyan),
            InteractionMode::Preview => ("PREVIEW", Color::Green),
        };

        let line = match &self.toast {
            Some(toast) => {
                let col = match toast.level {
                    NotifyLevel::Info => Color::LightCyan,
                    NotifyLevel::Warning => Color::Yellow,
                    NotifyLevel::Error => Color::Red,
                };
                Line::from(vec![
                    Span::styled(format!("[ {} ] ", mode), Style::new().fg(col)),
                    Span::styled(toast.message.clone(), Style::new().fg(col)),
                ])
            }
            None => {
                let location = self
                    .active_tab()
                    .and_then(|tab| tab.view.selected())
                    .map(|row| row.node.path().to_owned())
                    .unwrap_or_default();
                Line::styled(format!("[ {} ] {}", mode, location), Style::new().fg(col))
            }
        };

        let status = Paragraph::new(vec![line, Line::styled(KEY_HELP, Style::new().dark_gray())])
            .block(Block::default().title(format!("{:─>width$}", "", width = 12)));
        f.render_widget(status, area);
    }
}

fn draw_prompt(f: &mut Frame<'_>, prompt: &Prompt) {
    let area = centered(f.area(), 60, if prompt.is_pick() { 60 } else { 20 });
    let block = Block::bordered()
        .title(format!(" {} ", prompt.title()))
        .border_type(BorderType::Rounded)
        .style(Style::new().fg(Color::Cyan));
    f.render_widget(Clear, area);

    if prompt.is_confirm() {
        let body = Paragraph::new("y: yes    n / esc: no")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(body, area);
        return;
    }

    let query = if prompt.query.is_empty() && !prompt.placeholder().is_empty() {
        Line::styled(prompt.placeholder().to_owned(), Style::new().dark_gray().italic())
    } else {
        Line::from(format!("> {}", prompt.query))
    };

    if !prompt.is_pick() {
        f.render_widget(Paragraph::new(query).wrap(Wrap { trim: true }).block(block), area);
        return;
    }

    let inner = block.inner(area);
    f.render_widget(block, area);
    let [query_area, list_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);
    f.render_widget(Paragraph::new(query), query_area);

    let options = prompt.options();
    let items: Vec<ListItem> = prompt
        .filtered
        .iter()
        .enumerate()
        .map(|(pos, &idx)| {
            let mark = match (prompt.is_multi(), prompt.marked.contains(&idx)) {
                (false, _) => "",
                (true, true) => "[x] ",
                (true, false) => "[ ] ",
            };
            let item = ListItem::new(format!("{}{}", mark, options[idx]));
            if pos == prompt.cursor {
                item.style(Style::default().bold().white().on_black())
            } else {
                item
            }
        })
        .collect();
    f.render_widget(List::new(items), list_area);
}
