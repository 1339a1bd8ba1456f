//! Interactive launcher loop.

use crate::app::{App, key_event};
use crate::ui::{self, View};
use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use sift_core::config::Config;
use sift_core::{Plugin, Router};
use std::io::{self, Stdout};
use tracing::{debug, error, info};

/// Raw mode and alternate screen for as long as it lives
struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

pub async fn run(config: &Config, text: String) -> Result<()> {
    let (mut router, mut updates) = Router::from_config(config)?;
    let mut tui = Tui::enter()?;
    let mut app = App::new();
    let mut events = EventStream::new();

    router.open(text);
    info!("Launcher opened");

    loop {
        let active = router.active_plugin().clone();
        let results = active.result();
        let hint = active.meta().hint;
        app.set_result_len(results.len());
        let view = View {
            results: &results,
            hint: &hint,
            builtin: router.is_builtin(&active),
        };
        tui.terminal.draw(|f| ui::render(f, &mut app, &view))?;

        tokio::select! {
            Some(event) = events.next() => {
                let key = match event {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
                    Ok(_) => continue,
                    Err(e) => {
                        error!("Event stream error: {}", e);
                        continue;
                    }
                };

                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    break;
                }

                let handled = key_event(&key, &router.config().keys, app.entry_focused)
                    .is_some_and(|event| router.keypress(event));
                if handled {
                    continue;
                }

                if let Some(text) = app.edit(&key) {
                    router.set_text(text);
                } else if key.code == KeyCode::Enter && !app.entry_focused {
                    debug!("Activating selection {:?}", app.selected());
                    router.activate();
                }
            }

            Some(update) = updates.recv() => {
                if let Some(text) = app.handle_update(update) {
                    router.set_text(text);
                }
            }

            Some(request) = router.next_session_request() => router.apply(request),
        }

        // Apply whatever the last step produced before the next frame
        while let Ok(update) = updates.try_recv() {
            if let Some(text) = app.handle_update(update) {
                router.set_text(text);
            }
        }

        if app.should_quit {
            break;
        }
    }

    drop(tui);
    info!("Launcher closed");
    Ok(())
}
