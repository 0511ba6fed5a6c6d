//! Volume and mute state plus the volume bar widget.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Volume at startup.
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Keyboard nudge size.
pub const VOLUME_STEP: f32 = 0.1;

/// Mouse wheel nudge size.
pub const SCROLL_STEP: f32 = 0.05;

/// Icon tier shown next to the volume bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeIcon {
    Muted,
    Low,
    High,
}

impl VolumeIcon {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Muted => "󰝟",
            Self::Low => "󰖀",
            Self::High => "󰕾",
        }
    }
}

/// Volume state.
#[derive(Debug, Clone)]
pub struct VolumeState {
    level: f32,
    muted: bool,
    /// Level to restore on unmute
    previous: f32,
    /// A pointer drag on the volume bar is in progress
    pub dragging: bool,
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME)
    }
}

impl VolumeState {
    pub fn new(initial: f32) -> Self {
        let level = clamp_volume(initial);
        Self {
            level,
            muted: level == 0.0,
            previous: if level > 0.0 { level } else { DEFAULT_VOLUME },
            dragging: false,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Set the level, clamped to [0, 1]. Returns the level to apply.
    pub fn set(&mut self, volume: f32) -> f32 {
        self.level = clamp_volume(volume);
        self.muted = self.level == 0.0;
        self.level
    }

    /// Adjust the level by `delta`. Returns the level to apply.
    pub fn nudge(&mut self, delta: f32) -> f32 {
        // Round to the step grid so repeated nudges land on exact values.
        let target = ((self.level + delta) * 100.0).round() / 100.0;
        self.set(target)
    }

    /// Mute, or restore the level recorded when muting. Returns the level to apply.
    pub fn toggle_mute(&mut self) -> f32 {
        if self.muted {
            self.level = self.previous;
            self.muted = false;
        } else {
            self.previous = self.level;
            self.level = 0.0;
            self.muted = true;
        }
        self.level
    }

    pub fn icon(&self) -> VolumeIcon {
        if self.muted || self.level == 0.0 {
            VolumeIcon::Muted
        } else if self.level < 0.5 {
            VolumeIcon::Low
        } else {
            VolumeIcon::High
        }
    }

    /// Fill of the volume bar as a percentage.
    pub fn fill_percent(&self) -> u16 {
        (self.level * 100.0).round() as u16
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Volume ratio for a pointer at (x, y) relative to the bar.
///
/// A bar taller than it is wide is measured from its bottom edge upward,
/// otherwise from its left edge rightward. Points outside the bar clamp to
/// the nearest end.
pub fn ratio_from_pointer(area: Rect, x: u16, y: u16) -> f32 {
    let (offset, span) = if area.height > area.width {
        let bottom = i32::from(area.y) + i32::from(area.height) - 1;
        (bottom - i32::from(y), i32::from(area.height) - 1)
    } else {
        (i32::from(x) - i32::from(area.x), i32::from(area.width) - 1)
    };

    if span <= 0 {
        return if offset >= 0 { 1.0 } else { 0.0 };
    }
    (offset as f32 / span as f32).clamp(0.0, 1.0)
}

/// Render the volume fill, horizontally or vertically depending on the area.
pub fn render_volume_bar(frame: &mut Frame, area: Rect, state: &VolumeState) {
    let fill = f32::from(state.fill_percent()) / 100.0;
    let filled_style = Style::default().fg(Color::Green);
    let empty_style = Style::default().fg(Color::DarkGray);

    if area.height > area.width {
        let filled = (fill * f32::from(area.height)).round() as u16;
        let width = area.width as usize;
        let lines: Vec<Line> = (0..area.height)
            .map(|row| {
                // Row 0 is the top; fill grows from the bottom.
                if area.height - row <= filled {
                    Line::from(Span::styled("█".repeat(width), filled_style))
                } else {
                    Line::from(Span::styled("░".repeat(width), empty_style))
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    } else {
        let filled = (fill * f32::from(area.width)).round() as u16;
        let empty = area.width.saturating_sub(filled);
        let line = Line::from(vec![
            Span::styled("━".repeat(filled as usize), filled_style),
            Span::styled("─".repeat(empty as usize), empty_style),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_volume() {
        let state = VolumeState::default();
        assert_eq!(state.level(), 0.7);
        assert!(!state.is_muted());
        assert_eq!(state.icon(), VolumeIcon::High);
    }

    #[test]
    fn test_set_clamps() {
        let mut state = VolumeState::default();

        assert_eq!(state.set(-0.5), 0.0);
        assert!(state.is_muted());
        assert_eq!(state.icon(), VolumeIcon::Muted);

        assert_eq!(state.set(1.7), 1.0);
        assert!(!state.is_muted());

        assert_eq!(state.set(f32::NAN), 0.0);
        assert!(state.is_muted());
    }

    #[test]
    fn test_mute_round_trip_restores_exact_level() {
        let mut state = VolumeState::default();
        state.set(0.42);

        assert_eq!(state.toggle_mute(), 0.0);
        assert!(state.is_muted());
        assert_eq!(state.toggle_mute(), 0.42);
        assert!(!state.is_muted());

        // Repeated pairs stay stable.
        state.toggle_mute();
        state.toggle_mute();
        assert_eq!(state.level(), 0.42);
    }

    #[test]
    fn test_unmute_after_dragging_to_zero() {
        let mut state = VolumeState::default();
        state.set(0.0);
        assert!(state.is_muted());

        assert_eq!(state.toggle_mute(), DEFAULT_VOLUME);
    }

    #[test]
    fn test_icon_tiers() {
        let mut state = VolumeState::default();
        state.set(0.49);
        assert_eq!(state.icon(), VolumeIcon::Low);
        state.set(0.5);
        assert_eq!(state.icon(), VolumeIcon::High);
        state.set(0.0);
        assert_eq!(state.icon(), VolumeIcon::Muted);
    }

    #[test]
    fn test_nudge() {
        let mut state = VolumeState::default();
        assert_eq!(state.nudge(VOLUME_STEP), 0.8);
        state.nudge(VOLUME_STEP);
        state.nudge(VOLUME_STEP);
        assert_eq!(state.nudge(VOLUME_STEP), 1.0);

        state.set(0.05);
        assert_eq!(state.nudge(-VOLUME_STEP), 0.0);
        assert!(state.is_muted());
    }

    #[test]
    fn test_horizontal_pointer_ratio() {
        let bar = Rect::new(10, 5, 11, 1);
        assert_eq!(ratio_from_pointer(bar, 10, 5), 0.0);
        assert_eq!(ratio_from_pointer(bar, 15, 5), 0.5);
        assert_eq!(ratio_from_pointer(bar, 20, 5), 1.0);
        // Outside the bar, including a different row.
        assert_eq!(ratio_from_pointer(bar, 2, 0), 0.0);
        assert_eq!(ratio_from_pointer(bar, 70, 9), 1.0);
    }

    #[test]
    fn test_vertical_pointer_ratio() {
        let bar = Rect::new(50, 2, 1, 11);
        // Bottom row is y = 12.
        assert_eq!(ratio_from_pointer(bar, 50, 12), 0.0);
        assert_eq!(ratio_from_pointer(bar, 50, 7), 0.5);
        assert_eq!(ratio_from_pointer(bar, 50, 2), 1.0);
        assert_eq!(ratio_from_pointer(bar, 0, 0), 1.0);
        assert_eq!(ratio_from_pointer(bar, 50, 30), 0.0);
    }
}
