//! Keyboard input handling with vim-style bindings

use crossterm::event::{KeyCode, KeyEvent};
use flitify_core::Route;

use crate::app::{App, AppResult, PromptKind, StatusLevel, Tab, View};

/// Handle a key event
pub async fn handle_key(app: &mut App, key: KeyEvent) -> AppResult {
    if app.prompt.is_some() {
        handle_prompt(app, key).await;
        return AppResult::Continue;
    }

    match app.view {
        View::Login(_) => handle_login(app, key).await,
        View::Computers(_) => handle_computers(app, key).await,
        View::Interact(_) => handle_interact(app, key).await,
    }
}

/// Keys shared by the signed-in views
async fn handle_global(app: &mut App, key: KeyEvent) -> Option<AppResult> {
    match key.code {
        KeyCode::Char('q') => return Some(AppResult::Quit),
        KeyCode::Char('c') => app.navigate(Route::Computers).await,
        KeyCode::Char('i') => app.navigate(Route::Interact).await,
        KeyCode::Char('L') => app.navigate(Route::Logout).await,
        KeyCode::Char('P') => app.open_prompt(PromptKind::ChangePassword),
        KeyCode::Esc => app.clear_status(),
        KeyCode::Char('?') => app.set_status(
            "c:computers i:interact P:password L:logout q:quit",
            StatusLevel::Info,
        ),
        _ => return None,
    }

    Some(AppResult::Continue)
}

async fn handle_login(app: &mut App, key: KeyEvent) -> AppResult {
    let View::Login(form) = &mut app.view else {
        return AppResult::Continue;
    };

    match key.code {
        KeyCode::Esc => return AppResult::Quit,
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => form.toggle_focus(),
        KeyCode::Backspace => {
            form.active_field().pop();
        }
        KeyCode::Char(c) => form.active_field().push(c),
        KeyCode::Enter => app.submit_login().await,
        _ => {}
    }

    AppResult::Continue
}

async fn handle_computers(app: &mut App, key: KeyEvent) -> AppResult {
    let View::Computers(view) = &mut app.view else {
        return AppResult::Continue;
    };

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if view.cursor + 1 < view.clients.len() {
                view.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view.cursor = view.cursor.saturating_sub(1);
        }
        KeyCode::Char('a') => app.open_prompt(PromptKind::AddClient),
        KeyCode::Char('s') => {
            if let Some(client) = view.selected() {
                let id = client.client_id.clone();
                app.open_prompt(PromptKind::ChangeSecret(id));
            }
        }
        KeyCode::Char('x') | KeyCode::Char('d') => {
            if let Some(client) = view.selected() {
                let id = client.client_id.clone();
                app.open_prompt(PromptKind::ConfirmDelete(id));
            }
        }
        KeyCode::Char('r') => app.refresh_computers().await,
        _ => {
            if let Some(result) = handle_global(app, key).await {
                return result;
            }
        }
    }

    AppResult::Continue
}

async fn handle_interact(app: &mut App, key: KeyEvent) -> AppResult {
    let tab = match &app.view {
        View::Interact(view) => view.tab,
        _ => return AppResult::Continue,
    };

    match key.code {
        KeyCode::Char('J') | KeyCode::Char(']') => app.select_client(1).await,
        KeyCode::Char('K') | KeyCode::Char('[') => app.select_client(-1).await,
        KeyCode::Tab => app.switch_tab(tab.next()).await,
        KeyCode::Char('1') => app.switch_tab(Tab::Status).await,
        KeyCode::Char('2') => app.switch_tab(Tab::Files).await,
        KeyCode::Char('3') => app.switch_tab(Tab::Shell).await,
        KeyCode::Char('r') => app.refresh_online().await,
        _ => {
            let handled = match tab {
                Tab::Status => false,
                Tab::Files => handle_files(app, key).await,
                Tab::Shell => handle_shell(app, key),
            };
            if !handled {
                if let Some(result) = handle_global(app, key).await {
                    return result;
                }
            }
        }
    }

    AppResult::Continue
}

async fn handle_files(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.files_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.files_cursor(-1),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => app.files_enter().await,
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => app.files_up().await,
        KeyCode::Char('u') => app.open_prompt(PromptKind::Upload),
        _ => return false,
    }

    true
}

fn handle_shell(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Enter | KeyCode::Char(':') => app.open_prompt(PromptKind::Shell),
        _ => return false,
    }

    true
}

/// Keys while a text prompt is open
async fn handle_prompt(app: &mut App, key: KeyEvent) {
    let Some(prompt) = app.prompt.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Esc => app.prompt = None,
        KeyCode::Enter => app.submit_prompt().await,
        KeyCode::Backspace => {
            prompt.input.pop();
        }
        KeyCode::Char(c) => prompt.input.push(c),
        _ => {}
    }
}
