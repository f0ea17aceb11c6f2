pub mod app;
pub mod ui;

use std::{error::Error, io};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use crate::board::Board;
use app::{App, InputMode, LoginField, Screen};
use ui::ui;

pub fn run_tui(board: &Board) -> Result<(), Box<dyn Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(board);
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.screen == Screen::Login {
            match key.code {
                KeyCode::Esc => return Ok(()),
                KeyCode::Tab | KeyCode::Down => app.next_login_field(),
                KeyCode::Left | KeyCode::Right if app.login.field == LoginField::Role => app.toggle_login_role(),
                KeyCode::Enter => app.submit_login(),
                KeyCode::Backspace => app.login_backspace(),
                KeyCode::Char(c) => app.login_input(c),
                _ => {}
            }
            continue;
        }

        match app.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Char('+') | KeyCode::Char('=') => app.step_selected(10),
                KeyCode::Char('-') => app.step_selected(-10),
                KeyCode::Char('c') => app.claim_selected(),
                KeyCode::Char('m') => app.start_comment(),
                KeyCode::Char('v') | KeyCode::Tab => app.toggle_tab(),
                KeyCode::Char('r') => app.reload(),
                KeyCode::Char('o') => app.logout(),
                _ => {}
            },
            InputMode::Editing => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => {
                    app.input_buffer.push(c);
                }
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            }
        }
    }
}
