use crate::{
    App, AppView,
    config::{self, ConfigForm},
    log_util::log_debug,
    question_gateway::QuestionSource,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct ConfigManager<'a> {
    app: &'a mut App,
}

impl<'a> ConfigManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_config(&mut self) {
        self.app.config_form = ConfigForm::from_config(config::current());
        self.app
            .config_form
            .set_status("Use ←/→ to adjust values, s to save changes.");
        self.app.view = AppView::Config;
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        if self.app.config_form.is_editing_openai_key() {
            self.handle_key_edit(key);
            return;
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => {
                self.app.config_form.select_next();
            }
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => {
                self.app.config_form.select_previous();
            }
            (KeyModifiers::NONE, KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-')) => {
                self.app.config_form.adjust_current(-1);
            }
            (
                KeyModifiers::NONE,
                KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') | KeyCode::Char('='),
            ) => {
                self.app.config_form.adjust_current(1);
            }
            (KeyModifiers::NONE, KeyCode::Enter) if self.app.config_form.is_openai_key_selected() => {
                self.app.config_form.start_editing_openai_key();
            }
            (KeyModifiers::NONE, KeyCode::Char('s')) | (KeyModifiers::NONE, KeyCode::Enter) => {
                self.save_config_changes();
            }
            (KeyModifiers::NONE, KeyCode::Char('r')) => self.reset_config_form(),
            (KeyModifiers::NONE, KeyCode::Char('m')) => {
                if self.app.config_form.dirty {
                    self.save_config_changes();
                }
                self.app.return_to_topics();
            }
            _ => {}
        }
    }

    fn handle_key_edit(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.app.config_form.apply_openai_key_edit(),
            KeyCode::Esc => self.app.config_form.cancel_openai_key_edit(),
            KeyCode::Backspace => self.app.config_form.backspace_openai_key(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.app.config_form.push_openai_key_char(ch)
            }
            _ => {}
        }
    }

    fn save_config_changes(&mut self) {
        if !self.app.config_form.dirty {
            self.app
                .config_form
                .set_status("No pending changes to save.");
            return;
        }

        let form = self.app.config_form.clone();
        match config::update(|config| form.write_into(config)) {
            Ok(updated) => {
                self.rebuild_question_source(&updated);
                self.app.config_form.apply_saved(updated);
                self.app.config_form.set_status(format!(
                    "Saved configuration to {}",
                    config::config_file_path().display()
                ));
                log_debug("App: configuration saved");
            }
            Err(err) => {
                App::push_error(
                    &mut self.app.error,
                    format!("Failed to save configuration: {}", err),
                );
                self.app
                    .config_form
                    .set_status("Failed to save configuration. Check error panel.");
                log_debug(&format!("App: failed to save configuration: {}", err));
            }
        }
    }

    fn rebuild_question_source(&mut self, updated: &config::AppConfig) {
        match QuestionSource::from_config(updated) {
            Ok(source) => {
                log_debug(&format!("App: question source switched to {}", source.label()));
                self.app.question_source = Some(source);
            }
            Err(err) => {
                self.app.question_source = None;
                App::push_error(
                    &mut self.app.error,
                    format!("Question source unavailable: {}", err),
                );
            }
        }
    }

    fn reset_config_form(&mut self) {
        let current = config::current();
        self.app.config_form = ConfigForm::from_config(current);
        self.app
            .config_form
            .set_status("Reverted to saved configuration values.");
    }
}
