use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::intersection::{IntersectionConfig, IntersectionState, Lane, SignalPhase};

/// Queue slots drawn on each approach
const ARM_CELLS: usize = 10;
/// Side of the square grid, in cells: two arms plus the 3-cell box
const GRID_CELLS: usize = ARM_CELLS * 2 + 3;
/// Row and column of the box centre
const CENTER: usize = ARM_CELLS + 1;

/// Training figures shown in the header
///
/// Plain values only; the renderer never reaches into the environment or
/// the agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingStatus {
    pub episode: usize,
    pub total_episodes: usize,
    pub reward: f32,
    pub epsilon: f64,
    pub buffer_len: usize,
    pub buffer_capacity: usize,
    pub speed: &'static str,
    pub paused: bool,
    pub finished: bool,
}

/// Draws the crossroads, queued vehicles and signal lights
pub struct Renderer {
    stop_line: i32,
    spawn_spacing: i32,
}

impl Renderer {
    pub fn new(config: &IntersectionConfig) -> Self {
        Self {
            stop_line: config.stop_line,
            spawn_spacing: config.spawn_spacing.max(1),
        }
    }

    pub fn render(&self, frame: &mut Frame, state: &IntersectionState, status: &TrainingStatus) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Intersection
                Constraint::Length(3), // Footer
            ])
            .split(frame.area());

        frame.render_widget(self.render_status(status), chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);

        frame.render_widget(self.render_intersection(state), body[0]);
        frame.render_widget(self.render_lanes(state), body[1]);

        frame.render_widget(self.render_controls(), chunks[2]);
    }

    /// Queue slot for a vehicle position; 0 is next to the stop line
    fn slot(&self, position: i32) -> usize {
        let distance = (self.stop_line - position).max(0);
        ((distance / self.spawn_spacing) as usize).min(ARM_CELLS - 1)
    }

    /// Grid cell (row, column) for a slot on the given approach
    fn cell(lane: Lane, slot: usize) -> (usize, usize) {
        match lane {
            Lane::North => (ARM_CELLS - 1 - slot, CENTER),
            Lane::South => (ARM_CELLS + 3 + slot, CENTER),
            Lane::West => (CENTER, ARM_CELLS - 1 - slot),
            Lane::East => (CENTER, ARM_CELLS + 3 + slot),
        }
    }

    /// Box cell holding the light for an approach
    fn light_cell(lane: Lane) -> (usize, usize) {
        match lane {
            Lane::North => (CENTER - 1, CENTER),
            Lane::South => (CENTER + 1, CENTER),
            Lane::West => (CENTER, CENTER - 1),
            Lane::East => (CENTER, CENTER + 1),
        }
    }

    fn render_intersection(&self, state: &IntersectionState) -> Paragraph<'_> {
        let blank = Span::raw("  ");
        let mut grid = vec![vec![blank; GRID_CELLS]; GRID_CELLS];

        let road = Style::default().fg(Color::DarkGray);
        for i in 0..ARM_CELLS {
            for lane in Lane::ALL {
                let (row, col) = Self::cell(lane, i);
                grid[row][col] = Span::styled("··", road);
            }
        }

        let junction = Style::default().bg(Color::DarkGray);
        for row in CENTER - 1..=CENTER + 1 {
            for col in CENTER - 1..=CENTER + 1 {
                grid[row][col] = Span::styled("  ", junction);
            }
        }

        for lane in Lane::ALL {
            let green = state.is_green(lane);

            let (row, col) = Self::light_cell(lane);
            let light = if green { Color::Green } else { Color::Red };
            grid[row][col] = Span::styled(
                "● ",
                Style::default()
                    .fg(light)
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );

            let vehicle = if green {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::Yellow)
            };
            for &position in state.lane(lane).positions() {
                let (row, col) = Self::cell(lane, self.slot(position));
                grid[row][col] = Span::styled("██", vehicle);
            }
        }

        let lines: Vec<Line> = grid.into_iter().map(Line::from).collect();

        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .border_style(Style::default().fg(Color::White))
                    .title(" Intersection "),
            )
            .alignment(Alignment::Center)
    }

    fn render_lanes(&self, state: &IntersectionState) -> Paragraph<'_> {
        let label = Style::default().fg(Color::Yellow);
        let value = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);

        let (phase, phase_color) = match state.signal {
            SignalPhase::NsGreen => ("NS green", Color::Green),
            SignalPhase::EwGreen => ("EW green", Color::Green),
        };

        let mut lines = vec![
            Line::from(vec![
                Span::styled("Signal: ", label),
                Span::styled(
                    phase,
                    Style::default().fg(phase_color).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("Phase time: ", label),
                Span::styled(state.phase_time.to_string(), value),
            ]),
            Line::from(vec![
                Span::styled("Step: ", label),
                Span::styled(state.step_count.to_string(), value),
            ]),
            Line::from(""),
        ];

        for lane in Lane::ALL {
            let count = state.lane(lane).count();
            let color = if state.is_green(lane) {
                Color::Cyan
            } else {
                Color::Yellow
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{} ", lane.label()), label),
                Span::styled("■".repeat(count), Style::default().fg(color)),
                Span::raw(" "),
                Span::styled(count.to_string(), value),
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Waiting: ", label),
            Span::styled(state.total_vehicles().to_string(), value),
        ]));

        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Queues "),
        )
    }

    fn render_status(&self, status: &TrainingStatus) -> Paragraph<'_> {
        let label = Style::default().fg(Color::Yellow);
        let value = Style::default().fg(Color::White);

        let mut spans = vec![
            Span::styled("Episode: ", label),
            Span::styled(
                format!("{}/{}", status.episode, status.total_episodes),
                value.add_modifier(Modifier::BOLD),
            ),
            Span::raw("    "),
            Span::styled("Reward: ", label),
            Span::styled(format!("{:.2}", status.reward), value),
            Span::raw("    "),
            Span::styled("Epsilon: ", label),
            Span::styled(format!("{:.2}", status.epsilon), value),
            Span::raw("    "),
            Span::styled("Memory: ", label),
            Span::styled(
                format!("{}/{}", status.buffer_len, status.buffer_capacity),
                value,
            ),
            Span::raw("    "),
            Span::styled("Speed: ", label),
            Span::styled(status.speed, value),
        ];

        if status.finished {
            spans.push(Span::raw("    "));
            spans.push(Span::styled(
                "DONE",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ));
        } else if status.paused {
            spans.push(Span::raw("    "));
            spans.push(Span::styled(
                "PAUSED",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM))
    }

    fn render_controls(&self) -> Paragraph<'_> {
        let text = vec![Line::from(vec![
            Span::styled("Space", Style::default().fg(Color::Cyan)),
            Span::raw(" pause | "),
            Span::styled("1-4", Style::default().fg(Color::Cyan)),
            Span::raw(" speed | "),
            Span::styled("Q", Style::default().fg(Color::Red)),
            Span::raw(" to quit"),
        ])];

        Paragraph::new(text).alignment(Alignment::Center)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(&IntersectionConfig::default())
    }
}
