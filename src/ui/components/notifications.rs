//! Transient toast notifications.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const ERROR_TTL: Duration = Duration::from_secs(3);
const INFO_TTL: Duration = Duration::from_secs(2);

/// Oldest toasts are dropped beyond this many.
const MAX_VISIBLE: usize = 4;

const TOAST_WIDTH: u16 = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct Notifications {
    items: VecDeque<Notification>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>, now: Instant) {
        self.push(NotificationKind::Error, message.into(), now + ERROR_TTL);
    }

    pub fn info(&mut self, message: impl Into<String>, now: Instant) {
        self.push(NotificationKind::Info, message.into(), now + INFO_TTL);
    }

    fn push(&mut self, kind: NotificationKind, message: String, expires_at: Instant) {
        if self.items.len() == MAX_VISIBLE {
            self.items.pop_front();
        }
        self.items.push_back(Notification {
            kind,
            message,
            expires_at,
        });
    }

    /// Drop expired notifications.
    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|n| n.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.items.iter().filter(|n| n.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Stack notifications in the top-right corner.
pub fn render_notifications(frame: &mut Frame, area: Rect, notifications: &Notifications) {
    let width = TOAST_WIDTH.min(area.width);
    let mut y = area.y + 1;

    for notification in notifications.iter() {
        if y + 3 > area.y + area.height {
            break;
        }
        let toast = Rect {
            x: area.x + area.width - width,
            y,
            width,
            height: 3,
        };

        let (title, color) = match notification.kind {
            NotificationKind::Error => ("Error", Color::Red),
            NotificationKind::Info => ("Info", Color::Green),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(color));

        frame.render_widget(Clear, toast);
        frame.render_widget(
            Paragraph::new(notification.message.as_str())
                .style(Style::default().fg(color))
                .block(block)
                .wrap(Wrap { trim: true }),
            toast,
        );
        y += 3;
    }
}
