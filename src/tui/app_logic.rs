use super::app_state::{AppMode, Banner, InputField};
use crate::cli::parse_optional_date;
use crate::copier::CopySummary;
use crate::indexer::FileRecord;
use crate::session::SessionState;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{error, info};

pub struct TuiApp {
    pub(super) session: SessionState,
    /// Records passing the current filters, recomputed after every change.
    pub(super) visible: Vec<FileRecord>,
    /// Position of the cursor within `visible`.
    pub(super) current_selection_idx: usize,
    pub(super) scroll_offset: usize,
    pub(super) quit: bool,
    pub(super) mode: AppMode,
    pub(super) input: String,
    pub(super) input_cursor_pos: usize,
    pub(super) list_viewport_height: usize,
    pub(super) banner: Option<Banner>,
    pub(super) last_summary: Option<CopySummary>,
}

impl TuiApp {
    pub fn new(session: SessionState) -> Self {
        let mut app = TuiApp {
            session,
            visible: Vec::new(),
            current_selection_idx: 0,
            scroll_offset: 0,
            quit: false,
            mode: AppMode::Normal,
            input: String::new(),
            input_cursor_pos: 0,
            list_viewport_height: 0, // Will be updated by ui_renderer
            banner: None,
            last_summary: None,
        };
        app.refresh_visible();
        app
    }

    pub(super) fn with_banner(mut self, banner: Banner) -> Self {
        self.banner = Some(banner);
        self
    }

    /// Re-applies the filters and keeps the cursor inside the list.
    pub(super) fn refresh_visible(&mut self) {
        self.visible = self.session.visible();
        if self.current_selection_idx >= self.visible.len() {
            self.current_selection_idx = self.visible.len().saturating_sub(1);
        }
        self.ensure_selection_is_visible_in_viewport();
    }

    pub(super) fn select_next_visible_item(&mut self) {
        self.move_selection_in_visible_list(1);
    }

    pub(super) fn select_previous_visible_item(&mut self) {
        self.move_selection_in_visible_list(-1);
    }

    pub(super) fn move_selection_in_visible_list(&mut self, delta: i32) {
        if self.visible.is_empty() {
            return;
        }
        let len = self.visible.len() as i32;
        self.current_selection_idx =
            (self.current_selection_idx as i32 + delta).rem_euclid(len) as usize;
        self.ensure_selection_is_visible_in_viewport();
    }

    pub(super) fn current_record(&self) -> Option<&FileRecord> {
        self.visible.get(self.current_selection_idx)
    }

    pub(super) fn toggle_current_item_selection(&mut self) {
        let Some(path) = self.current_record().map(|r| r.relative_path.clone()) else {
            return;
        };
        self.session.toggle(&path);
    }

    pub(super) fn select_all_visible_items(&mut self) {
        self.session.select_visible();
    }

    pub(super) fn deselect_all_visible_items(&mut self) {
        self.session.deselect_visible();
    }

    pub(super) fn cycle_subdir_filter(&mut self, step: isize) {
        self.session.cycle_subdir(step);
        self.refresh_visible();
    }

    pub(super) fn ensure_selection_is_visible_in_viewport(&mut self) {
        if self.visible.is_empty() || self.list_viewport_height == 0 {
            self.scroll_offset = 0;
            return;
        }
        let list_height = self.list_viewport_height;
        let pos = self.current_selection_idx;

        if pos < self.scroll_offset {
            self.scroll_offset = pos;
        } else if pos >= self.scroll_offset + list_height {
            self.scroll_offset = pos.saturating_sub(list_height - 1);
        }

        let num_visible_items = self.visible.len();
        if num_visible_items <= list_height {
            self.scroll_offset = 0;
        } else {
            self.scroll_offset = self.scroll_offset.min(num_visible_items - list_height);
        }
    }

    /// Clones or pulls, then re-indexes. Blocks until done.
    pub(super) fn refresh_repository(&mut self) {
        self.last_summary = None;
        match self.session.refresh() {
            Ok(count) => {
                info!("Refreshed {}: {} files", self.session.url(), count);
                self.banner = Some(Banner::Info(format!(
                    "Loaded {} files from {}",
                    count,
                    self.session.url()
                )));
            }
            Err(e) => {
                error!("Refresh of {} failed: {}", self.session.url(), e);
                self.banner = Some(Banner::Error(e.to_string()));
            }
        }
        self.current_selection_idx = 0;
        self.refresh_visible();
    }

    /// Copies the checked files. Blocks until every copy has finished.
    pub(super) fn copy_selected_files(&mut self) {
        if self.session.selection.is_empty() {
            self.banner = Some(Banner::Error("No files selected for download.".to_string()));
            return;
        }
        let results = self.session.copy_selection();
        let summary = self.session.summarize(&results);
        self.banner = Some(if summary.has_failures() {
            Banner::Error(summary.headline())
        } else {
            Banner::Info(summary.headline())
        });
        self.last_summary = Some(summary);
    }

    fn begin_editing(&mut self, field: InputField) {
        self.input = match field {
            InputField::DateFrom => self.session.criteria.date_from.map(|d| d.to_string()),
            InputField::DateTo => self.session.criteria.date_to.map(|d| d.to_string()),
            InputField::Url => Some(self.session.url().to_string()),
        }
        .unwrap_or_default();
        self.input_cursor_pos = self.input.chars().count();
        self.mode = AppMode::Editing(field);
    }

    fn apply_input(&mut self, field: InputField) {
        match field {
            InputField::DateFrom | InputField::DateTo => match parse_optional_date(&self.input) {
                Ok(date) => {
                    if field == InputField::DateFrom {
                        self.session.criteria.date_from = date;
                    } else {
                        self.session.criteria.date_to = date;
                    }
                    self.banner = self
                        .session
                        .criteria
                        .is_inverted()
                        .then(|| {
                            Banner::Info("From date is after To date: nothing matches".to_string())
                        });
                    self.refresh_visible();
                }
                Err(e) => self.banner = Some(Banner::Error(e)),
            },
            InputField::Url => {
                let url = self.input.trim().to_string();
                if url.is_empty() {
                    self.banner = Some(Banner::Error(
                        "Please provide a valid Git repository URL.".to_string(),
                    ));
                    return;
                }
                self.session.set_url(url);
                self.refresh_repository();
            }
        }
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    // --- Event handling sub-methods ---
    pub(super) fn handle_normal_mode_input(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.select_next_visible_item(),
            KeyCode::Up | KeyCode::Char('k') => self.select_previous_visible_item(),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_current_item_selection(),
            KeyCode::Char('a') => {
                if key_event.modifiers.is_empty() || key_event.modifiers == KeyModifiers::CONTROL {
                    self.select_all_visible_items();
                }
            }
            KeyCode::Char('d') => {
                if key_event.modifiers.is_empty() {
                    self.deselect_all_visible_items();
                }
            }
            KeyCode::Char('s') => self.cycle_subdir_filter(1),
            KeyCode::Char('S') => self.cycle_subdir_filter(-1),
            KeyCode::Char('f') => self.begin_editing(InputField::DateFrom),
            KeyCode::Char('t') => self.begin_editing(InputField::DateTo),
            KeyCode::Char('u') => self.begin_editing(InputField::Url),
            KeyCode::Char('r') => self.refresh_repository(),
            KeyCode::Char('c') => self.copy_selected_files(),
            _ => {}
        }
    }

    pub(super) fn handle_editing_mode_input(&mut self, field: InputField, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Enter => {
                self.mode = AppMode::Normal;
                self.apply_input(field);
            }
            KeyCode::Esc => {
                self.mode = AppMode::Normal;
                self.input.clear();
                self.input_cursor_pos = 0;
            }
            KeyCode::Char(c) => {
                let at = self.byte_index(self.input_cursor_pos);
                self.input.insert(at, c);
                self.input_cursor_pos += 1;
            }
            KeyCode::Backspace => {
                if self.input_cursor_pos > 0 {
                    self.input_cursor_pos -= 1;
                    let at = self.byte_index(self.input_cursor_pos);
                    self.input.remove(at);
                }
            }
            KeyCode::Left => {
                if self.input_cursor_pos > 0 {
                    self.input_cursor_pos -= 1;
                }
            }
            KeyCode::Right => {
                if self.input_cursor_pos < self.input.chars().count() {
                    self.input_cursor_pos += 1;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SubdirFilter;
    use crate::indexer::DateSource;
    use crate::repo::tests::{make_origin, url_of};
    use crate::session::SessionConfig;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut TuiApp, field: InputField, text: &str) {
        for c in text.chars() {
            app.handle_editing_mode_input(field, key(KeyCode::Char(c)));
        }
    }

    fn loaded_app(temp: &TempDir) -> TuiApp {
        let origin = temp.path().join("origin");
        make_origin(
            &origin,
            &[
                ("a/x.txt", "x", 1_704_110_400),
                ("b/y.txt", "y", 1_717_243_200),
            ],
        );
        let config = SessionConfig {
            clone_dir: temp.path().join("clone"),
            destination: temp.path().join("dest"),
            workers: 2,
            date_source: DateSource::Commit,
            fresh: false,
        };
        let mut session = SessionState::new(url_of(&origin), config);
        session.refresh().unwrap();
        TuiApp::new(session)
    }

    #[test]
    fn test_navigation_wraps() {
        let temp = TempDir::new().unwrap();
        let mut app = loaded_app(&temp);

        app.handle_normal_mode_input(key(KeyCode::Up));
        assert_eq!(app.current_record().unwrap().relative_path, "b/y.txt");
        app.handle_normal_mode_input(key(KeyCode::Char('j')));
        assert_eq!(app.current_record().unwrap().relative_path, "a/x.txt");
    }

    #[test]
    fn test_toggle_and_copy() {
        let temp = TempDir::new().unwrap();
        let mut app = loaded_app(&temp);

        app.handle_normal_mode_input(key(KeyCode::Char(' ')));
        app.handle_normal_mode_input(key(KeyCode::Char('c')));

        assert!(temp.path().join("dest/a/x.txt").exists());
        assert!(!temp.path().join("dest/b/y.txt").exists());
        assert_eq!(app.last_summary.as_ref().unwrap().succeeded, 1);
        assert!(matches!(app.banner, Some(Banner::Info(_))));
    }

    #[test]
    fn test_copy_without_selection_warns() {
        let temp = TempDir::new().unwrap();
        let mut app = loaded_app(&temp);

        app.handle_normal_mode_input(key(KeyCode::Char('c')));

        assert!(matches!(app.banner, Some(Banner::Error(_))));
        assert!(!temp.path().join("dest").exists());
    }

    #[test]
    fn test_subdir_cycle_filters_rows() {
        let temp = TempDir::new().unwrap();
        let mut app = loaded_app(&temp);

        app.handle_normal_mode_input(key(KeyCode::Char('s')));
        assert_eq!(app.session.criteria.subdir, SubdirFilter::parse("a"));
        assert_eq!(app.visible.len(), 1);

        app.handle_normal_mode_input(key(KeyCode::Char('a')));
        app.handle_normal_mode_input(key(KeyCode::Char('S')));
        assert_eq!(app.visible.len(), 2);
        assert_eq!(app.session.selection.len(), 1);
    }

    #[test]
    fn test_date_input_applies_filter() {
        let temp = TempDir::new().unwrap();
        let mut app = loaded_app(&temp);

        app.handle_normal_mode_input(key(KeyCode::Char('f')));
        assert_eq!(app.mode, AppMode::Editing(InputField::DateFrom));
        type_text(&mut app, InputField::DateFrom, "2024-05-01");
        app.handle_editing_mode_input(InputField::DateFrom, key(KeyCode::Enter));

        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.session.criteria.date_from, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(app.visible.len(), 1);
        assert_eq!(app.visible[0].relative_path, "b/y.txt");
    }

    #[test]
    fn test_bad_date_input_keeps_filter() {
        let temp = TempDir::new().unwrap();
        let mut app = loaded_app(&temp);

        app.handle_normal_mode_input(key(KeyCode::Char('t')));
        type_text(&mut app, InputField::DateTo, "yesterday");
        app.handle_editing_mode_input(InputField::DateTo, key(KeyCode::Enter));

        assert_eq!(app.session.criteria.date_to, None);
        assert!(matches!(app.banner, Some(Banner::Error(_))));
        assert_eq!(app.visible.len(), 2);
    }

    #[test]
    fn test_inverted_dates_show_nothing() {
        let temp = TempDir::new().unwrap();
        let mut app = loaded_app(&temp);

        app.handle_normal_mode_input(key(KeyCode::Char('f')));
        type_text(&mut app, InputField::DateFrom, "2024-07-01");
        app.handle_editing_mode_input(InputField::DateFrom, key(KeyCode::Enter));
        app.handle_normal_mode_input(key(KeyCode::Char('t')));
        type_text(&mut app, InputField::DateTo, "2024-01-01");
        app.handle_editing_mode_input(InputField::DateTo, key(KeyCode::Enter));

        assert!(app.visible.is_empty());
        assert!(app.current_record().is_none());
        app.handle_normal_mode_input(key(KeyCode::Char(' ')));
        assert!(app.session.selection.is_empty());
    }

    #[test]
    fn test_input_editing_cursor() {
        let temp = TempDir::new().unwrap();
        let mut app = loaded_app(&temp);
        app.mode = AppMode::Editing(InputField::DateTo);

        type_text(&mut app, InputField::DateTo, "2024-0601");
        for _ in 0..2 {
            app.handle_editing_mode_input(InputField::DateTo, key(KeyCode::Left));
        }
        type_text(&mut app, InputField::DateTo, "-");
        assert_eq!(app.input, "2024-06-01");

        app.handle_editing_mode_input(InputField::DateTo, key(KeyCode::Esc));
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.session.criteria.date_to, None);
    }

    #[test]
    fn test_refresh_error_becomes_banner() {
        let temp = TempDir::new().unwrap();
        let mut app = loaded_app(&temp);

        app.handle_normal_mode_input(key(KeyCode::Char('u')));
        app.input.clear();
        app.input_cursor_pos = 0;
        let missing = url_of(&temp.path().join("missing"));
        type_text(&mut app, InputField::Url, &missing);
        app.handle_editing_mode_input(InputField::Url, key(KeyCode::Enter));

        assert!(matches!(app.banner, Some(Banner::Error(_))));
        assert!(app.visible.is_empty());
        assert!(fs::read_dir(temp.path().join("origin")).is_ok());
    }
}
