//! Search field and result list.
//!
//! Lookups are debounced on the trailing edge: every edit cancels the pending
//! lookup and, for queries longer than two characters, schedules a new one.
//! Each issued lookup gets a sequence number and only the completion of the
//! most recent one is applied.

use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::client::models::Track;

/// Default quiet period before a lookup is issued.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// Queries must be longer than this (after trimming) to be searched.
const MAX_IGNORED_QUERY_LEN: usize = 2;

/// Width of the play control at the right edge of each result row.
pub const PLAY_CONTROL_WIDTH: u16 = 3;

/// Highlight symbol shown next to the selected row.
const HIGHLIGHT_SYMBOL: &str = "> ";

/// What the main area shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchView {
    /// Idle screen shown before searching or after clearing the query.
    #[default]
    Welcome,
    Results,
}

/// Outcome of editing the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryChange {
    Cleared,
    TooShort,
    Scheduled,
}

/// A lookup ready to be sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub seq: u64,
    pub query: String,
}

/// Where a click on the result list landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultHit {
    Row(usize),
    PlayControl(usize),
}

impl ResultHit {
    pub fn index(self) -> usize {
        match self {
            Self::Row(i) | Self::PlayControl(i) => i,
        }
    }
}

/// Search state.
#[derive(Debug)]
pub struct SearchState {
    /// Raw text in the search field
    pub query: String,

    /// Current main-area view
    pub view: SearchView,

    /// A lookup is in flight
    pub loading: bool,

    /// Results of the last applied search; `None` until one completes
    pub results: Option<Vec<Track>>,

    /// Selection in the result list
    pub list_state: ListState,

    debounce: Duration,

    /// Trimmed query and the instant it becomes due
    pending: Option<(String, Instant)>,

    /// Sequence number of the lookup whose completion will be applied
    awaiting: Option<u64>,

    next_seq: u64,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new(DEBOUNCE)
    }
}

impl SearchState {
    pub fn new(debounce: Duration) -> Self {
        Self {
            query: String::new(),
            view: SearchView::Welcome,
            loading: false,
            results: None,
            list_state: ListState::default(),
            debounce,
            pending: None,
            awaiting: None,
            next_seq: 0,
        }
    }

    /// Add character to query.
    pub fn input(&mut self, c: char, now: Instant) -> QueryChange {
        self.query.push(c);
        self.on_query_changed(now)
    }

    /// Remove last character from query.
    pub fn backspace(&mut self, now: Instant) -> QueryChange {
        self.query.pop();
        self.on_query_changed(now)
    }

    /// Clear the whole field.
    pub fn clear(&mut self, now: Instant) -> QueryChange {
        self.query.clear();
        self.on_query_changed(now)
    }

    /// React to an edit of the query field.
    pub fn on_query_changed(&mut self, now: Instant) -> QueryChange {
        self.pending = None;

        let trimmed = self.query.trim();
        if trimmed.is_empty() {
            // A late completion must not pop the result area back up.
            self.awaiting = None;
            self.loading = false;
            self.view = SearchView::Welcome;
            return QueryChange::Cleared;
        }

        if trimmed.chars().count() <= MAX_IGNORED_QUERY_LEN {
            return QueryChange::TooShort;
        }

        self.pending = Some((trimmed.to_string(), now + self.debounce));
        QueryChange::Scheduled
    }

    /// Whether a lookup is scheduled but not yet issued.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Issue the scheduled lookup once its quiet period has elapsed.
    pub fn poll_due(&mut self, now: Instant) -> Option<SearchRequest> {
        match &self.pending {
            Some((_, due)) if now >= *due => {}
            _ => return None,
        }
        let (query, _) = self.pending.take()?;

        self.next_seq += 1;
        let seq = self.next_seq;
        self.awaiting = Some(seq);
        self.loading = true;
        self.view = SearchView::Results;

        Some(SearchRequest { seq, query })
    }

    /// Apply a successful completion. Returns false if it was stale.
    pub fn apply_results(&mut self, seq: u64, tracks: Vec<Track>) -> bool {
        if self.awaiting != Some(seq) {
            return false;
        }
        self.awaiting = None;
        self.loading = false;

        self.list_state
            .select(if tracks.is_empty() { None } else { Some(0) });
        *self.list_state.offset_mut() = 0;
        self.results = Some(tracks);
        true
    }

    /// Apply a failed completion. Previous results stay on screen.
    /// Returns false if it was stale.
    pub fn apply_failure(&mut self, seq: u64) -> bool {
        if self.awaiting != Some(seq) {
            return false;
        }
        self.awaiting = None;
        self.loading = false;
        true
    }

    /// Number of rendered results.
    pub fn len(&self) -> usize {
        self.results.as_ref().map_or(0, Vec::len)
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.results.as_ref().and_then(|r| r.get(index))
    }

    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    /// Move selection up.
    pub fn select_previous(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) if i > 0 => i - 1,
            Some(_) => len - 1,
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    /// Move selection down.
    pub fn select_next(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) if i < len - 1 => i + 1,
            Some(_) => 0,
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    /// Map a click inside the result list area to a row or its play control.
    pub fn hit_test(&self, area: Rect, x: u16, y: u16) -> Option<ResultHit> {
        if self.view != SearchView::Results {
            return None;
        }
        let inner = Block::default().borders(Borders::ALL).inner(area);
        if x < inner.x || x >= inner.x + inner.width || y < inner.y || y >= inner.y + inner.height
        {
            return None;
        }

        let index = self.list_state.offset() + (y - inner.y) as usize;
        if index >= self.len() {
            return None;
        }

        let play_start = (inner.x + inner.width).saturating_sub(PLAY_CONTROL_WIDTH);
        if x >= play_start {
            Some(ResultHit::PlayControl(index))
        } else {
            Some(ResultHit::Row(index))
        }
    }
}

/// Render the search input box.
pub fn render_search_input(frame: &mut Frame, area: Rect, state: &SearchState, focused: bool) {
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Search")
        .border_style(Style::default().fg(border_color));

    let line = if state.query.is_empty() && !focused {
        Line::from(Span::styled(
            "What do you want to listen to?  (Ctrl+F or /)",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let cursor = if focused { "_" } else { "" };
        Line::from(vec![
            Span::styled(&state.query, Style::default().fg(Color::White)),
            Span::styled(cursor, Style::default().fg(Color::Yellow)),
        ])
    };

    frame.render_widget(Paragraph::new(line).block(block), area);
}

/// Render the welcome screen or the result list.
pub fn render_results(
    frame: &mut Frame,
    area: Rect,
    state: &mut SearchState,
    focused: bool,
    current_id: Option<&str>,
) {
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    if state.view == SearchView::Welcome {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Welcome")
            .border_style(Style::default().fg(border_color));
        let text = vec![
            Line::from(Span::styled(
                "Preview any song in seconds",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Type at least three characters to search the catalog."),
            Line::from("Click a result or press Enter to play its preview."),
            Line::from(""),
            Line::from(Span::styled(
                "Space play/pause • ↑/↓ volume • m mute • ? help",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        frame.render_widget(
            Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
            area,
        );
        return;
    }

    let title = match (&state.results, state.loading) {
        (_, true) => String::from("Results (searching...)"),
        (Some(results), false) => format!("Results ({})", results.len()),
        (None, false) => String::from("Results"),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(border_color));

    let results = match &state.results {
        Some(results) if !results.is_empty() => results,
        Some(_) => {
            let empty = Paragraph::new("No results found")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(empty, area);
            return;
        }
        None => {
            // A failed first lookup leaves nothing to show.
            let message = if state.loading {
                "Searching..."
            } else {
                "No results yet"
            };
            let hint = Paragraph::new(message)
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(hint, area);
            return;
        }
    };

    let inner_width = block.inner(area).width;
    let symbol_width = if state.list_state.selected().is_some() {
        HIGHLIGHT_SYMBOL.width() as u16
    } else {
        0
    };
    let row_width = inner_width.saturating_sub(symbol_width) as usize;

    let items: Vec<ListItem> = results
        .iter()
        .map(|track| result_row(track, row_width, current_id == Some(track.id.as_str())))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(HIGHLIGHT_SYMBOL);

    frame.render_stateful_widget(list, area, &mut state.list_state);
}

/// One result row: "title - artist" on the left, play control flush right.
fn result_row(track: &Track, width: usize, is_current: bool) -> ListItem<'static> {
    let control_width = PLAY_CONTROL_WIDTH as usize;
    let text_width = width.saturating_sub(control_width);

    let playable = track.preview_url().is_some();
    let (title_style, artist_style) = if !playable {
        (
            Style::default().fg(Color::DarkGray),
            Style::default().fg(Color::DarkGray),
        )
    } else if is_current {
        (
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            Style::default().fg(Color::Green),
        )
    } else {
        (
            Style::default().fg(Color::White),
            Style::default().fg(Color::Cyan),
        )
    };

    let title = truncate_to_width(&track.title, text_width);
    let rest = text_width.saturating_sub(title.width());
    let artist = truncate_to_width(&format!(" - {}", track.display_artist()), rest);
    let padding = rest.saturating_sub(artist.width());
    let control = if playable { " ▶ " } else { " - " };

    ListItem::new(Line::from(vec![
        Span::styled(title, title_style),
        Span::styled(artist, artist_style),
        Span::raw(" ".repeat(padding)),
        Span::styled(control, Style::default().fg(Color::Green)),
    ]))
}

/// Cut a string so that it occupies at most `max` terminal columns.
fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    let budget = max.saturating_sub(1);
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(c);
        used += w;
    }
    if max > 0 {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::ArtistRef;

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {id}"),
            duration: Some(180),
            preview: Some(format!("https://cdn.example.com/{id}.mp3")),
            artist: ArtistRef {
                name: String::from("Artist"),
            },
            album: None,
        }
    }

    fn type_str(state: &mut SearchState, text: &str, now: Instant) -> QueryChange {
        let mut change = QueryChange::Cleared;
        for c in text.chars() {
            change = state.input(c, now);
        }
        change
    }

    #[test]
    fn test_short_queries_never_schedule() {
        let t0 = Instant::now();
        let mut state = SearchState::default();

        for query in ["a", "ab", "  ab  ", "é"] {
            state.query = query.to_string();
            assert_eq!(state.on_query_changed(t0), QueryChange::TooShort);
            assert!(!state.has_pending());
            assert_eq!(state.poll_due(t0 + Duration::from_secs(5)), None);
            assert_eq!(state.view, SearchView::Welcome);
            assert!(!state.loading);
        }
    }

    #[test]
    fn test_debounce_issues_one_request_for_final_query() {
        let t0 = Instant::now();
        let mut state = SearchState::default();

        state.input('r', t0);
        state.input('e', t0 + Duration::from_millis(100));
        state.input('i', t0 + Duration::from_millis(200));

        // Quiet period measured from the last keystroke.
        assert_eq!(state.poll_due(t0 + Duration::from_millis(450)), None);

        let request = state.poll_due(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(request.query, "rei");
        assert_eq!(request.seq, 1);
        assert!(state.loading);
        assert_eq!(state.view, SearchView::Results);

        assert_eq!(state.poll_due(t0 + Duration::from_secs(10)), None);
    }

    #[test]
    fn test_keystroke_cancels_pending_lookup() {
        let t0 = Instant::now();
        let mut state = SearchState::default();

        type_str(&mut state, "queen", t0);
        state.backspace(t0 + Duration::from_millis(250));
        state.backspace(t0 + Duration::from_millis(260));
        state.backspace(t0 + Duration::from_millis(270));

        // "qu" is too short, so the earlier schedule is simply gone.
        assert!(!state.has_pending());
        assert_eq!(state.poll_due(t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_query_is_trimmed() {
        let t0 = Instant::now();
        let mut state = SearchState::default();
        type_str(&mut state, "  abba ", t0);

        let request = state.poll_due(t0 + DEBOUNCE).unwrap();
        assert_eq!(request.query, "abba");
    }

    #[test]
    fn test_clear_restores_welcome_and_drops_in_flight() {
        let t0 = Instant::now();
        let mut state = SearchState::default();
        type_str(&mut state, "abba", t0);
        let request = state.poll_due(t0 + DEBOUNCE).unwrap();
        assert_eq!(state.view, SearchView::Results);

        assert_eq!(state.clear(t0 + DEBOUNCE), QueryChange::Cleared);
        assert_eq!(state.view, SearchView::Welcome);
        assert!(!state.loading);

        assert!(!state.apply_results(request.seq, vec![track("1")]));
        assert_eq!(state.view, SearchView::Welcome);
        assert!(state.results.is_none());
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let t0 = Instant::now();
        let mut state = SearchState::default();

        type_str(&mut state, "abb", t0);
        let first = state.poll_due(t0 + DEBOUNCE).unwrap();
        state.input('a', t0 + DEBOUNCE);
        let second = state.poll_due(t0 + DEBOUNCE * 2).unwrap();
        assert!(second.seq > first.seq);

        assert!(state.apply_results(second.seq, vec![track("new")]));
        assert!(!state.apply_results(first.seq, vec![track("old")]));

        assert_eq!(state.track(0).unwrap().id, "new");
        assert!(!state.loading);
    }

    #[test]
    fn test_empty_results_differ_from_no_search() {
        let t0 = Instant::now();
        let mut state = SearchState::default();
        assert!(state.results.is_none());

        type_str(&mut state, "zzzzzz", t0);
        let request = state.poll_due(t0 + DEBOUNCE).unwrap();
        assert!(state.apply_results(request.seq, vec![]));

        assert_eq!(state.results, Some(vec![]));
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn test_failure_keeps_previous_results() {
        let t0 = Instant::now();
        let mut state = SearchState::default();

        type_str(&mut state, "abba", t0);
        let first = state.poll_due(t0 + DEBOUNCE).unwrap();
        state.apply_results(first.seq, vec![track("1"), track("2")]);

        state.input('!', t0 + DEBOUNCE);
        let second = state.poll_due(t0 + DEBOUNCE * 2).unwrap();
        assert!(state.loading);

        assert!(state.apply_failure(second.seq));
        assert!(!state.loading);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_hit_test_row_and_play_control() {
        let t0 = Instant::now();
        let mut state = SearchState::default();
        type_str(&mut state, "abba", t0);
        let request = state.poll_due(t0 + DEBOUNCE).unwrap();
        state.apply_results(request.seq, vec![track("1"), track("2"), track("3")]);

        let area = Rect::new(0, 3, 40, 10);
        // Second row: border at y=3, rows start at y=4.
        assert_eq!(state.hit_test(area, 5, 5), Some(ResultHit::Row(1)));
        assert_eq!(state.hit_test(area, 37, 5), Some(ResultHit::PlayControl(1)));
        assert_eq!(state.hit_test(area, 38, 5), Some(ResultHit::PlayControl(1)));
        // Right border and rows past the end of the list.
        assert_eq!(state.hit_test(area, 39, 5), None);
        assert_eq!(state.hit_test(area, 5, 9), None);
    }

    #[test]
    fn test_selection_wraps() {
        let t0 = Instant::now();
        let mut state = SearchState::default();
        type_str(&mut state, "abba", t0);
        let request = state.poll_due(t0 + DEBOUNCE).unwrap();
        state.apply_results(request.seq, vec![track("1"), track("2")]);

        assert_eq!(state.selected(), Some(0));
        state.select_previous();
        assert_eq!(state.selected(), Some(1));
        state.select_next();
        assert_eq!(state.selected(), Some(0));
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello world", 6), "hello…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }
}
