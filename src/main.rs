mod config;
mod error;
mod evaluator;
mod fetch_worker;
mod log_util;
mod question;
mod question_gateway;
mod quiz_session;
mod topics;
mod ui_renderer;
mod view_managers;

use color_eyre::Result;
use config::ConfigForm;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use dotenvy::dotenv;
use fetch_worker::FetchWorker;
use log_util::log_debug;
use question_gateway::QuestionSource;
use quiz_session::{FetchOutcome, QuizSession};
use ratatui::{DefaultTerminal, Frame};
use std::time::Duration;
use ui_renderer::UiRenderer;
use view_managers::{ConfigManager, QuizManager, TopicsManager};

pub(crate) const LOADING_FRAMES: [&str; 4] = ["-", "\\", "|", "/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AppView {
    Topics,
    Quiz,
    Config,
}

fn main() -> color_eyre::Result<()> {
    dotenv().ok();
    color_eyre::install()?;
    let terminal = ratatui::init();
    let result = App::new().run(terminal);
    ratatui::restore();
    result
}

/// The main application which holds the state and logic of the application.
#[derive(Debug)]
pub struct App {
    /// Is the application running?
    pub(crate) running: bool,
    /// Current view being displayed.
    pub(crate) view: AppView,
    /// Highlighted entry in the topic list.
    pub(crate) topic_index: usize,
    /// Highlighted choice in the quiz view.
    pub(crate) choice_cursor: usize,
    /// The quiz session state machine.
    pub(crate) session: QuizSession,
    /// Background runner for question requests.
    pub(crate) fetch_worker: FetchWorker,
    /// Question source built from the configuration, if it could be built.
    pub(crate) question_source: Option<QuestionSource>,
    /// Spinner frame index for the active loading indicator.
    pub(crate) loading_frame: usize,
    /// Latest informational message, such as a refused action.
    pub(crate) status: Option<String>,
    /// Application-level errors (configuration, question source setup).
    pub(crate) error: Option<String>,
    /// Holds the editable configuration state when rendering the config view.
    pub(crate) config_form: ConfigForm,
}

impl App {
    /// Construct a new instance of [`App`].
    pub fn new() -> Self {
        let mut aggregated_error: Option<String> = None;

        if let Err(err) = config::initialize() {
            Self::push_error(
                &mut aggregated_error,
                format!("Configuration load failed: {}", err),
            );
        }

        let config = config::current();
        let question_source = match QuestionSource::from_config(&config) {
            Ok(source) => {
                log_debug(&format!("App: using {}", source.label()));
                Some(source)
            }
            Err(err) => {
                Self::push_error(
                    &mut aggregated_error,
                    format!("Question source unavailable: {}", err),
                );
                None
            }
        };

        Self::with_source(question_source, config::ConfigForm::from_config(config))
            .with_error(aggregated_error)
    }

    pub(crate) fn with_source(
        question_source: Option<QuestionSource>,
        config_form: ConfigForm,
    ) -> Self {
        Self {
            running: false,
            view: AppView::Topics,
            topic_index: 0,
            choice_cursor: 0,
            session: QuizSession::new(),
            fetch_worker: FetchWorker::new(),
            question_source,
            loading_frame: 0,
            status: None,
            error: None,
            config_form,
        }
    }

    fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    /// Run the application's main loop.
    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        self.running = true;
        let tick_rate = Duration::from_millis(120);
        while self.running {
            self.poll_fetches();
            terminal.draw(|frame| self.render(frame))?;
            self.handle_crossterm_events(tick_rate)?;
        }
        Ok(())
    }

    /// Dispatch rendering based on the active view.
    fn render(&mut self, frame: &mut Frame) {
        UiRenderer::new(self).render(frame);
    }

    /// Reads the crossterm events and updates the state of [`App`].
    fn handle_crossterm_events(&mut self, tick_rate: Duration) -> Result<()> {
        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
                Event::Mouse(_) => {}
                Event::Resize(_, _) => {}
                _ => {}
            }
            self.poll_fetches();
        } else {
            self.on_tick();
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        if self.session.state().loading {
            self.loading_frame = (self.loading_frame + 1) % LOADING_FRAMES.len();
        }
        self.poll_fetches();
    }

    /// Feed every finished fetch into the session, oldest first.
    pub(crate) fn poll_fetches(&mut self) {
        while let Some(message) = self.fetch_worker.try_next() {
            match self.session.complete_fetch(message.id, message.result) {
                FetchOutcome::Installed => {
                    self.choice_cursor = 0;
                    self.status = Some("Question ready. Pick an answer.".to_string());
                }
                FetchOutcome::Failed(err) => {
                    log_debug(&format!("App: fetch failed ({})", err.kind()));
                    self.status = None;
                }
                FetchOutcome::Stale => {}
            }
        }
    }

    /// Handles the key events and updates the state of [`App`].
    pub(crate) fn on_key_event(&mut self, key: KeyEvent) {
        if self.view == AppView::Config && self.config_form.is_editing_openai_key() {
            ConfigManager::new(self).handle_key(key);
            return;
        }

        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Char('q'))
            | (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) => self.quit(),
            _ => match self.view {
                AppView::Topics => TopicsManager::new(self).handle_key(key),
                AppView::Quiz => QuizManager::new(self).handle_key(key),
                AppView::Config => ConfigManager::new(self).handle_key(key),
            },
        }
    }

    pub(crate) fn return_to_topics(&mut self) {
        if matches!(self.view, AppView::Config) {
            self.config_form = ConfigForm::from_config(config::current());
        }
        self.view = AppView::Topics;
    }

    /// Set running to false to quit the application.
    fn quit(&mut self) {
        self.running = false;
    }

    /// Append a message to an optional error slot.
    pub(crate) fn push_error(slot: &mut Option<String>, message: String) {
        if let Some(existing) = slot {
            existing.push_str(" | ");
            existing.push_str(&message);
        } else {
            *slot = Some(message);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::{
        config::AppConfig,
        question::sample_payload,
        question_gateway::BackendGateway,
        topics::Topic,
    };
    use crossterm::event::KeyEventState;

    pub(crate) fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    /// App whose question source points at a port nothing listens on.
    pub(crate) fn offline_app() -> App {
        let gateway = BackendGateway::new(reqwest::Client::new(), "http://127.0.0.1:9");
        App::with_source(
            Some(QuestionSource::Backend(gateway)),
            ConfigForm::from_config(AppConfig::default()),
        )
    }

    /// App showing the sample question for `topic`, unanswered.
    pub(crate) fn app_with_question(topic: Topic) -> App {
        let mut app = offline_app();
        let ticket = app.session.begin_topic(topic);
        app.session.fetch_succeeded(ticket.id, sample_payload());
        app.view = AppView::Quiz;
        app
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::topics::Topic;

    #[test]
    fn quit_keys_stop_the_app() {
        let mut app = offline_app();
        app.running = true;
        app.on_key_event(key(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[test]
    fn push_error_accumulates_messages() {
        let mut slot = None;
        App::push_error(&mut slot, "first".to_string());
        App::push_error(&mut slot, "second".to_string());
        assert_eq!(slot.as_deref(), Some("first | second"));
    }

    #[test]
    fn starts_on_topic_list_with_idle_session() {
        let app = offline_app();
        assert_eq!(app.view, AppView::Topics);
        assert!(app.session.state().current_question.is_none());
        assert!(!app.session.state().loading);
    }

    #[test]
    fn polling_with_nothing_pending_leaves_state_alone() {
        let mut app = app_with_question(Topic::Lymphatic);
        let before = app.session.state().clone();
        app.poll_fetches();
        assert_eq!(app.session.state(), &before);
    }
}
