mod app_logic;
mod app_state;
mod event_handler;
mod ui_renderer;

pub use self::run_tui::run_tui;

// Terminal setup/teardown and the main draw/event loop
mod run_tui {
    use super::app_logic::TuiApp;
    use super::app_state::Banner;
    use super::event_handler::handle_events;
    use super::ui_renderer::ui_frame;
    use crate::session::SessionState;
    use anyhow::Result;
    use crossterm::{
        event::{DisableMouseCapture, EnableMouseCapture},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::prelude::{CrosstermBackend, Terminal};
    use std::io::{self, Stdout};

    /// Runs the interactive shell until the user quits. `startup_error` is
    /// shown in the status bar, e.g. when the initial clone failed.
    pub fn run_tui(session: SessionState, startup_error: Option<String>) -> Result<()> {
        let mut app = TuiApp::new(session);
        if let Some(message) = startup_error {
            app = app.with_banner(Banner::Error(message));
        } else {
            let loaded = app.session.records().len();
            app = app.with_banner(Banner::Info(format!("Loaded {loaded} files")));
        }

        let mut terminal = init_terminal()?;
        let loop_result = run_loop(&mut terminal, &mut app);
        restore_terminal(terminal)?;
        loop_result
    }

    fn run_loop(
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        app: &mut TuiApp,
    ) -> Result<()> {
        while !app.quit {
            terminal.draw(|frame| ui_frame(frame, app))?;
            handle_events(app)?;
        }
        Ok(())
    }

    fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        Terminal::new(backend).map_err(Into::into)
    }

    fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor().map_err(Into::into)
    }
}
