use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, BorderType, Borders, Cell, Chart, Clear, Dataset, GraphType, List, ListItem,
        ListState, Paragraph, Row, Table, Widget, Wrap,
    },
    Frame,
};

use crate::app::{App, ChartData, Phase};
use crate::braille::BrailleCanvas;
use crate::coordinator::Coordinator;
use crate::format::{format_compact, format_delta, format_stat};
use crate::gateway::GatewayError;
use crate::map::{MapLayers, Viewport};
use crate::model::Metric;

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Dashboard
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    match &app.phase {
        Phase::Ready(coordinator) => render_dashboard(frame, app, coordinator, chunks[0]),
        Phase::Initializing { error } => render_initializing(frame, error.as_ref(), chunks[0]),
    }
    render_status_bar(frame, app, chunks[1]);

    if app.picker.is_some() {
        render_picker(frame, app, area);
    }
}

fn metric_color(metric: Metric) -> Color {
    match metric {
        Metric::Cases => Color::Rgb(204, 16, 52),
        Metric::Recovered => Color::Rgb(125, 215, 29),
        Metric::Deaths => Color::Rgb(251, 68, 67),
    }
}

fn metric_title(metric: Metric) -> &'static str {
    match metric {
        Metric::Cases => "Covid Cases",
        Metric::Recovered => "Recovered",
        Metric::Deaths => "Deaths",
    }
}

fn title_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

/// Flag emoji built from the two-letter iso code (regional indicator pair)
pub fn flag_emoji(iso_code: &str) -> String {
    if iso_code.len() != 2 || !iso_code.chars().all(|c| c.is_ascii_alphabetic()) {
        return String::from("  ");
    }
    iso_code
        .chars()
        .filter_map(|c| char::from_u32(0x1F1E6 + (c.to_ascii_uppercase() as u32 - 'A' as u32)))
        .collect()
}

fn render_initializing(frame: &mut Frame, error: Option<&GatewayError>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" COVID-19 TRACKER ", title_style()));

    let lines = match error {
        None => vec![Line::from(Span::styled(
            "Loading worldwide and per-country counters...",
            Style::default().fg(Color::Yellow),
        ))],
        Some(e) => vec![
            Line::from(Span::styled(
                "Could not load the dashboard",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(e.to_string()),
            Line::from(""),
            Line::from(Span::styled(
                "Press r to retry, q to quit",
                Style::default().fg(Color::DarkGray),
            )),
        ],
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_dashboard(frame: &mut Frame, app: &App, coordinator: &Coordinator, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(4), // Stat boxes
            Constraint::Min(8),    // Map / table / chart
        ])
        .split(area);

    render_header(frame, app, coordinator, rows[0]);
    render_stats(frame, coordinator, rows[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(rows[2]);
    render_map(frame, app, coordinator, body[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(body[1]);
    render_table(frame, coordinator, right[0]);
    render_chart(frame, app, coordinator.selected_metric(), right[1]);
}

fn render_header(frame: &mut Frame, app: &App, coordinator: &Coordinator, area: Rect) {
    let mut spans = vec![
        Span::styled(" COVID-19 TRACKER ", title_style()),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            coordinator.selected_region_name().to_owned(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(loading) = &app.loading {
        spans.push(Span::styled(
            format!("  loading {loading}..."),
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_stats(frame: &mut Frame, coordinator: &Coordinator, area: Rect) {
    let boxes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);

    let snapshot = coordinator.active_snapshot();
    for (metric, slot) in Metric::ALL.into_iter().zip(boxes.iter()) {
        let active = metric == coordinator.selected_metric();
        let color = metric_color(metric);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(if active { BorderType::Thick } else { BorderType::Plain })
            .border_style(Style::default().fg(if active { color } else { Color::DarkGray }))
            .title(Span::styled(
                format!(" {} ", metric_title(metric)),
                Style::default().fg(Color::Gray),
            ));

        let lines = vec![
            Line::from(Span::styled(
                format_delta(Some(snapshot.today(metric))),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("{} Total", format_stat(Some(snapshot.total(metric)))),
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).block(block), *slot);
    }
}

fn render_map(frame: &mut Frame, app: &App, coordinator: &Coordinator, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" Map ", title_style()));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 resolution per character
    let viewport = Viewport::from_focus(
        coordinator.map_focus(),
        inner.width as usize * 2,
        inner.height as usize * 4,
    );
    let markers = app.markers();
    let layers = app
        .map_renderer
        .render(inner.width as usize, inner.height as usize, &viewport, &markers);

    frame.render_widget(
        MapWidget {
            layers,
            marker_color: metric_color(coordinator.selected_metric()),
        },
        inner,
    );
}

/// Braille map layers with text labels overlaid
struct MapWidget {
    layers: MapLayers,
    marker_color: Color,
}

impl MapWidget {
    fn render_layer(canvas: &BrailleCanvas, style: Style, area: Rect, buf: &mut Buffer) {
        for (col, row, ch) in canvas.glyphs() {
            if col >= area.width as usize || row >= area.height as usize {
                continue;
            }
            let x = area.x + col as u16;
            let y = area.y + row as u16;
            buf[(x, y)].set_char(ch).set_style(style);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: coastlines, borders, region markers, selected region
        Self::render_layer(&self.layers.coastlines, Style::default().fg(Color::Cyan), area, buf);
        Self::render_layer(&self.layers.borders, Style::default().fg(Color::DarkGray), area, buf);
        Self::render_layer(&self.layers.markers, Style::default().fg(self.marker_color), area, buf);
        Self::render_layer(
            &self.layers.highlight,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            area,
            buf,
        );

        let label_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &self.layers.labels {
            if *ly >= area.height || *lx >= area.width {
                continue;
            }
            let max_len = area.width.saturating_sub(*lx) as usize;
            let y = area.y + *ly;
            for (i, ch) in text.chars().take(max_len.min(24)).enumerate() {
                buf[(area.x + *lx + i as u16, y)].set_char(ch).set_style(label_style);
            }
        }
    }
}

fn render_table(frame: &mut Frame, coordinator: &Coordinator, area: Rect) {
    let selected = coordinator.selected_region().as_value();
    let rows: Vec<Row> = coordinator
        .table_rows()
        .map(|row| {
            let style = if row.iso_code == selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(flag_emoji(row.iso_code)),
                Cell::from(row.country.to_owned()),
                Cell::from(Line::from(row.cases).alignment(Alignment::Right))
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            ])
            .style(style)
        })
        .collect();

    let widths = [Constraint::Length(3), Constraint::Min(10), Constraint::Length(13)];
    let table = Table::new(rows, widths)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(" Total cases by Country ", title_style())),
        );
    frame.render_widget(table, area);
}

fn render_chart(frame: &mut Frame, app: &App, metric: Metric, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" Worldwide new {metric} "),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let series = match (&app.chart, app.chart_series()) {
        (_, Some(series)) if !series.points.is_empty() => series,
        (ChartData::Failed(reason), _) => {
            let text = Paragraph::new(format!("History unavailable: {reason}"))
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(text, area);
            return;
        }
        _ => {
            let text = Paragraph::new("Loading history...")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(text, area);
            return;
        }
    };

    let points = series.plot_points();
    let max = series.max().max(1);
    let x_max = points.len().saturating_sub(1).max(1) as f64;
    let first = series.first_date().map(|d| d.format("%b %d").to_string()).unwrap_or_default();
    let last = series.last_date().map(|d| d.format("%b %d").to_string()).unwrap_or_default();

    let datasets = vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(metric_color(metric)))
        .data(&points)];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, x_max])
                .labels([first, last]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, max as f64])
                .labels([String::from("0"), format_compact(max / 2), format_compact(max)]),
        );
    frame.render_widget(chart, area);
}

fn render_picker(frame: &mut Frame, app: &App, area: Rect) {
    let Some(picker) = &app.picker else {
        return;
    };
    let popup = centered(area, 40, 70);
    frame.render_widget(Clear, popup);

    let entries = app.picker_entries();
    let items: Vec<ListItem> = entries
        .iter()
        .map(|(name, value)| {
            let flag = if *value == crate::model::RegionSelection::WORLDWIDE {
                String::from("🌐")
            } else {
                flag_emoji(value)
            };
            ListItem::new(format!("{flag} {name}"))
        })
        .collect();

    let title = if picker.query.is_empty() {
        String::from(" Select region (type to filter) ")
    } else {
        format!(" Select region: {} ", picker.query)
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Cyan))
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !entries.is_empty() {
        state.select(Some(picker.cursor.min(entries.len() - 1)));
    }
    frame.render_stateful_widget(list, popup, &mut state);
}

/// Rectangle of `percent_x` x `percent_y` centered in `area`
fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(notice) = &app.notice {
        Line::from(Span::styled(format!(" {}", notice.text), Style::default().fg(Color::Yellow)))
    } else if app.picker.is_some() {
        Line::from(Span::styled(
            " type:filter up/down:move enter:select esc:close",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let metric = app.coordinator().map(Coordinator::selected_metric);
        let mut spans = vec![Span::styled(" Metric: ", Style::default().fg(Color::DarkGray))];
        for (key, m) in ["1", "2", "3"].into_iter().zip(Metric::ALL) {
            let active = metric == Some(m);
            spans.push(Span::styled(
                format!("[{key}]{m} "),
                Style::default().fg(if active { metric_color(m) } else { Color::DarkGray }),
            ));
        }
        spans.push(Span::styled(
            "| /:region w:worldwide tab:metric r:retry q:quit",
            Style::default().fg(Color::DarkGray),
        ));
        Line::from(spans)
    };

    frame.render_widget(Paragraph::new(line), area);
}
