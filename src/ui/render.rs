use super::{App, ColorTarget, Mode};
use crate::color::{PackedColor, PALETTE};
use crate::model::{Column, Task};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use std::time::Instant;

const COLUMN_WIDTH: u16 = 30;
const BOARD_BG: Color = Color::Rgb(16, 18, 24);

impl App {
    pub(super) fn draw(&mut self, f: &mut Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.hits.clear();
        if self.is_loading() {
            let msg = Paragraph::new("Loading board…")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(msg, layout[1]);
        } else {
            self.draw_board(f, layout[1]);
        }
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::ColorPicker { target, cursor } => self.draw_picker(f, *target, *cursor),
            Mode::ConfirmDeleteColumn { column } => {
                let name = self
                    .store
                    .board()
                    .column(*column)
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                draw_confirm(f, &name);
            }
            _ => {}
        }
    }

    fn draw_header(&self, f: &mut Frame<'_>, area: Rect) {
        let saved = match self.saver.last_saved_at() {
            Some(at) => format!("saved {}", format_elapsed(at)),
            None => "not saved this session".to_string(),
        };
        let mut spans = vec![
            Span::styled(
                "tasklanes ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(self.repo.describe(), Style::default().fg(Color::DarkGray)),
            Span::raw("  •  "),
            Span::styled(saved, Style::default().fg(Color::Gray)),
        ];
        if self.saver.is_disabled() {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled("saving off", Style::default().fg(Color::Red)));
        } else if self.saver.is_dirty() {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled("unsaved", Style::default().fg(Color::Yellow)));
        }
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_board(&mut self, f: &mut Frame<'_>, area: Rect) {
        let column_count = self.store.board().columns.len();
        let visible = ((area.width / COLUMN_WIDTH) as usize).max(1);
        // One extra tile for "add column".
        self.column_offset = adjust_offset(
            self.selected_column,
            self.column_offset,
            visible,
            0,
            column_count + 1,
        );

        for slot in 0..visible {
            let idx = self.column_offset + slot;
            let x = area.x + slot as u16 * COLUMN_WIDTH;
            if x >= area.x + area.width {
                break;
            }
            let width = COLUMN_WIDTH.min(area.x + area.width - x);
            let tile = Rect::new(x, area.y, width, area.height);
            if idx < column_count {
                self.draw_column(f, idx, tile);
            } else if idx == column_count {
                self.draw_add_tile(f, tile);
                break;
            }
        }
    }

    fn draw_column(&mut self, f: &mut Frame<'_>, idx: usize, area: Rect) {
        let column = self.store.board().columns[idx].clone();
        let selected = idx == self.selected_column;
        let drag = self.store.drag();
        let accent = column.color.to_terminal();

        let title = match &self.mode {
            Mode::EditingTitle { column: id, field } if *id == column.id => Line::from(vec![
                Span::styled("■ ", Style::default().fg(accent)),
                Span::styled(
                    field.with_caret(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            _ => column_title(&column, selected),
        };
        let border = if selected && drag.is_some() {
            Style::default().fg(Color::LightYellow)
        } else {
            Style::default().fg(accent)
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border)
            .style(Style::default().bg(BOARD_BG));
        let inner = block.inner(area);
        f.render_widget(block, area);
        self.hits.columns.push((column.id, area));

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);
        let (list_area, input_area) = (rows[0], rows[1]);

        let viewport = list_area.height as usize;
        let mut offset = self.scroll_offsets.get(&column.id).copied().unwrap_or(0);
        let mut state = ListState::default();
        if selected && !column.tasks.is_empty() {
            offset = adjust_offset(self.selected_task, offset, viewport, 1, column.tasks.len());
            state.select(Some(self.selected_task));
        } else {
            offset = offset.min(column.tasks.len().saturating_sub(viewport));
        }
        self.scroll_offsets.insert(column.id, offset);
        *state.offset_mut() = offset;

        let text_width = list_area.width.saturating_sub(6) as usize;
        let items = column
            .tasks
            .iter()
            .map(|task| {
                let dragged = drag.map_or(false, |d| d.task == task.id);
                task_item(task, text_width, dragged)
            })
            .collect::<Vec<_>>();
        for (t_idx, task) in column.tasks.iter().enumerate().skip(offset).take(viewport) {
            let row = Rect::new(
                list_area.x,
                list_area.y + (t_idx - offset) as u16,
                list_area.width,
                1,
            );
            self.hits.tasks.push((column.id, task.id, row));
        }
        let list = List::new(items).highlight_style(
            Style::default()
                .bg(Color::Rgb(60, 64, 80))
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, list_area, &mut state);

        let input = match &self.mode {
            Mode::NewTask { column: id, field } if *id == column.id => Line::from(vec![
                Span::styled("+ ", Style::default().fg(Color::LightGreen)),
                Span::styled(field.with_caret(), Style::default().fg(Color::White)),
            ]),
            _ if selected => Line::from(Span::styled(
                "+ n: new task",
                Style::default().fg(Color::DarkGray),
            )),
            _ => Line::from(""),
        };
        f.render_widget(Paragraph::new(input), input_area);
    }

    fn draw_add_tile(&mut self, f: &mut Frame<'_>, area: Rect) {
        let height = area.height.min(3);
        let tile = Rect::new(area.x, area.y, area.width, height);
        let paragraph = Paragraph::new("+ add column (c)")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(paragraph, tile);
        self.hits.add_column = Some(tile);
    }

    fn draw_footer(&self, f: &mut Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        let spans = match &self.mode {
            Mode::EditingTitle { .. } | Mode::NewTask { .. } => vec![
                key("Enter", Color::LightGreen),
                Span::raw(" save  "),
                key("Esc", Color::LightRed),
                Span::raw(" close"),
            ],
            Mode::ColorPicker { .. } => vec![
                key("←→", Color::LightCyan),
                Span::raw(" choose  "),
                key("1-8", Color::LightCyan),
                Span::raw(" pick  "),
                key("Enter", Color::LightGreen),
                Span::raw(" apply  "),
                key("Esc", Color::LightRed),
                Span::raw(" close"),
            ],
            Mode::ConfirmDeleteColumn { .. } => vec![
                key("y", Color::LightRed),
                Span::raw(" delete  "),
                key("n/Esc", Color::LightGreen),
                Span::raw(" keep"),
            ],
            Mode::Normal if self.store.drag().is_some() => vec![
                key("←→", Color::LightCyan),
                Span::raw(" target  "),
                key("g/Enter", Color::LightGreen),
                Span::raw(" drop  "),
                key("Esc", Color::LightRed),
                Span::raw(" cancel"),
            ],
            Mode::Normal => vec![
                key("←↑↓→ / h j k l", Color::LightCyan),
                Span::raw(" move  "),
                key("c", Color::LightMagenta),
                Span::raw(" column  "),
                key("n", Color::LightMagenta),
                Span::raw(" task  "),
                key("r", Color::LightYellow),
                Span::raw(" rename  "),
                key("x", Color::LightGreen),
                Span::raw(" done  "),
                key("p/P", Color::LightYellow),
                Span::raw(" color  "),
                key("g m b", Color::LightGreen),
                Span::raw(" drag  "),
                key("d/D", Color::LightRed),
                Span::raw(" delete  "),
                key("q", Color::LightRed),
                Span::raw(" quit"),
            ],
        };
        Line::from(spans)
    }

    fn draw_picker(&self, f: &mut Frame<'_>, target: ColorTarget, cursor: usize) {
        let title = match target {
            ColorTarget::Task(_) => "Task color",
            ColorTarget::Column(_) => "Column color",
        };
        let area = centered_box(PALETTE.len() as u16 * 5 + 4, 6, f.size());
        let mut swatches = Vec::new();
        let mut labels = Vec::new();
        for (idx, (color, _)) in PALETTE.iter().enumerate() {
            let marker = if idx == cursor { "▲" } else { " " };
            swatches.push(Span::styled(" ███ ", Style::default().fg(color.to_terminal())));
            labels.push(Span::styled(
                format!(" {}{}  ", idx + 1, marker),
                if idx == cursor {
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                },
            ));
        }
        let body = vec![
            Line::from(swatches),
            Line::from(labels),
            Line::from(Span::styled(
                PALETTE[cursor].1,
                Style::default().fg(Color::White),
            )),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    title,
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn draw_confirm(f: &mut Frame<'_>, name: &str) {
    let area = centered_box(44, 7, f.size());
    let body = vec![
        Line::from(Span::styled(
            format!("Delete column \"{}\" and its tasks?", name),
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press y to confirm, n or Esc to cancel"),
    ];
    let dialog = Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(
                    "Confirm Delete",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn column_title(column: &Column, selected: bool) -> Line<'static> {
    let accent = column.color.to_terminal();
    Line::from(vec![
        Span::styled("■ ", Style::default().fg(accent)),
        Span::styled(
            format!(
                "{} ({})",
                truncate_text(&column.name, (COLUMN_WIDTH as usize).saturating_sub(10)),
                column.tasks.len()
            ),
            Style::default()
                .fg(accent)
                .add_modifier(if selected {
                    Modifier::BOLD | Modifier::UNDERLINED
                } else {
                    Modifier::BOLD
                }),
        ),
    ])
}

fn task_item(task: &Task, width: usize, dragged: bool) -> ListItem<'static> {
    let checkbox = if task.is_done { "[x] " } else { "[ ] " };
    let mut text_style = Style::default().fg(Color::White);
    if task.is_done {
        text_style = text_style
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT);
    }
    if dragged {
        text_style = text_style.add_modifier(Modifier::REVERSED);
    }
    let swatch_color = if task.color == PackedColor::WHITE {
        Color::Gray
    } else {
        task.color.to_terminal()
    };
    ListItem::new(Line::from(vec![
        Span::styled(checkbox, Style::default().fg(Color::Gray)),
        Span::styled("● ", Style::default().fg(swatch_color)),
        Span::styled(truncate_text(&task.text, width), text_style),
    ]))
}

fn centered_box(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect::new(
        r.x + (r.width - width) / 2,
        r.y + (r.height - height) / 2,
        width,
        height,
    )
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
