use crate::app::{App, PANEL_WIDTH};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Widget},
    Frame,
};
use urbmind_map::braille::BrailleCanvas;
use urbmind_map::map::MapLayers;

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map and panel
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    if app.has_panel() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(PANEL_WIDTH)])
            .split(rows[0]);
        render_map(frame, app, cols[0]);
        render_results(frame, app, cols[1]);
    } else {
        render_map(frame, app, rows[0]);
    }
    render_status_bar(frame, app, rows[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " UrbMind ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // The canvas keeps its measured size until the map re-measures, so it can
    // briefly differ from `inner`
    let map = app.session.surface();
    let (cols, rows) = map.canvas_cells();
    let map_widget = MapWidget {
        layers: map.render(),
        width: inner.width.min(cols as u16),
        height: inner.height.min(rows as u16),
    };
    frame.render_widget(map_widget, inner);
}

/// Braille map with overlays, markers and labels on top
struct MapWidget {
    layers: MapLayers,
    width: u16,
    height: u16,
}

impl MapWidget {
    fn render_layer(&self, canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= self.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= self.width as usize {
                    break;
                }
                // Empty braille cell
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.render_layer(&self.layers.coastlines, Color::Cyan, area, buf);
        self.render_layer(&self.layers.borders, Color::DarkGray, area, buf);

        for overlay in &self.layers.overlays {
            self.render_layer(&overlay.canvas, overlay.color, area, buf);
        }

        self.render_layer(&self.layers.markers, Color::LightRed, area, buf);

        let label_style = Style::default().fg(Color::White);
        for (lx, ly, text) in &self.layers.labels {
            if *ly >= self.height || *lx >= self.width {
                continue;
            }
            let x = area.x + *lx;
            let y = area.y + *ly;
            let max_len = self.width.saturating_sub(*lx) as usize;
            for (i, ch) in text.chars().take(max_len.min(24)).enumerate() {
                buf[(x + i as u16, y)].set_char(ch).set_style(label_style);
            }
        }
    }
}

fn render_results(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" Results ", Style::default().fg(Color::Yellow)));

    let items: Vec<ListItem> = app
        .results
        .features
        .iter()
        .take(9)
        .enumerate()
        .map(|(i, f)| {
            let selected = app.selected == Some(i);
            let style = if selected {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!("{} ", i + 1), Style::default().fg(Color::Yellow)),
                    Span::styled(f.text.clone(), style.add_modifier(Modifier::BOLD)),
                ]),
                Line::from(Span::styled(
                    format!("  {} · {}", f.kind().label(), f.neighborhood().unwrap_or("-")),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn on_off(on: bool, on_text: &'static str, off_text: &'static str) -> Span<'static> {
    if on {
        Span::styled(on_text, Style::default().fg(Color::Red))
    } else {
        Span::styled(off_text, Style::default().fg(Color::DarkGray))
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let session = &app.session;
    let overlay = session.overlays().active().map(|f| f.label()).unwrap_or("none");

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", Style::default().fg(Color::DarkGray)),
        Span::styled(app.lod_level(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        on_off(session.is_locked(), "[LOCK] ", "[lock] "),
        on_off(session.stabilizer().is_transitioning(), "[STAB] ", "[stab] "),
        on_off(app.input_focused, "[INPUT] ", "[input] "),
        Span::styled("overlay: ", Style::default().fg(Color::DarkGray)),
        Span::styled(overlay, Style::default().fg(Color::Green)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.status.clone(), Style::default().fg(Color::White)),
        Span::styled(
            " | 1-9:go a/b/s:overlay x:hide g:locate /:focus r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
