use crate::{App, AppView, log_util::log_debug, topics::Topic};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct QuizManager<'a> {
    app: &'a mut App,
}

impl<'a> QuizManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.next_choice(),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.previous_choice(),
            (KeyModifiers::NONE, KeyCode::Enter)
            | (KeyModifiers::NONE, KeyCode::Char(' '))
            | (KeyModifiers::NONE, KeyCode::Char('s')) => {
                let cursor = self.app.choice_cursor;
                self.answer(cursor)
            }
            (KeyModifiers::NONE, KeyCode::Char(digit @ '1'..='9')) => {
                self.answer(digit as usize - '1' as usize)
            }
            (KeyModifiers::NONE, KeyCode::Char('n')) | (KeyModifiers::NONE, KeyCode::Char('N')) => {
                self.request_remediation()
            }
            (KeyModifiers::NONE, KeyCode::Char('t')) => self.app.return_to_topics(),
            _ => {}
        }
    }

    /// Choose `topic` and send the request. Ignored while another question is loading.
    pub(crate) fn start_topic(&mut self, topic: Topic) {
        if self.app.session.state().loading {
            log_debug("App: question request already in progress; ignoring topic selection");
            return;
        }
        let Some(source) = self.app.question_source.clone() else {
            App::push_error(
                &mut self.app.error,
                "Question source unavailable. Check the configuration.".to_string(),
            );
            log_debug("App: question source unavailable; aborting request");
            return;
        };

        let ticket = self.app.session.begin_topic(topic);
        self.app.fetch_worker.spawn(source, ticket);
        self.app.choice_cursor = 0;
        self.app.loading_frame = 0;
        self.app.status = None;
        self.app.view = AppView::Quiz;
    }

    fn request_remediation(&mut self) {
        if self.app.session.state().loading {
            log_debug("App: question request already in progress; ignoring remediation");
            return;
        }
        let Some(source) = self.app.question_source.clone() else {
            App::push_error(
                &mut self.app.error,
                "Question source unavailable. Check the configuration.".to_string(),
            );
            return;
        };

        match self.app.session.request_remediation() {
            Ok(ticket) => {
                self.app.fetch_worker.spawn(source, ticket);
                self.app.choice_cursor = 0;
                self.app.loading_frame = 0;
                self.app.status = None;
            }
            Err(err) => {
                self.app.status = Some(err.to_string());
                log_debug(&format!("App: remediation refused: {}", err));
            }
        }
    }

    fn answer(&mut self, index: usize) {
        let outcome = self
            .app
            .session
            .select_option(index)
            .map(|validation| validation.suggest_remediation);
        match outcome {
            Ok(suggest_remediation) => {
                self.app.choice_cursor = index;
                self.app.status = Some(if suggest_remediation {
                    "Press n for another question on this topic.".to_string()
                } else {
                    "Pick another topic with t.".to_string()
                });
            }
            Err(err) => {
                self.app.status = Some(err.to_string());
                log_debug(&format!("App: answer refused: {}", err));
            }
        }
    }

    fn next_choice(&mut self) {
        let Some(count) = self.active_choice_count() else {
            return;
        };
        self.app.choice_cursor = (self.app.choice_cursor + 1) % count;
    }

    fn previous_choice(&mut self) {
        let Some(count) = self.active_choice_count() else {
            return;
        };
        if self.app.choice_cursor == 0 {
            self.app.choice_cursor = count - 1;
        } else {
            self.app.choice_cursor -= 1;
        }
    }

    /// Choice count while the cursor can still move, i.e. before the question is answered.
    fn active_choice_count(&self) -> Option<usize> {
        let state = self.app.session.state();
        if state.answer.is_some() {
            return None;
        }
        let count = state.current_question.as_ref()?.choice_count();
        if count == 0 { None } else { Some(count) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{QuizError, TransitionError},
        test_support::{app_with_question, key, offline_app},
    };

    #[test]
    fn cursor_wraps_and_enter_answers_highlighted_choice() {
        let mut app = app_with_question(Topic::Musculoskeletal);
        QuizManager::new(&mut app).handle_key(key(KeyCode::Up));
        assert_eq!(app.choice_cursor, 2);
        QuizManager::new(&mut app).handle_key(key(KeyCode::Down));
        QuizManager::new(&mut app).handle_key(key(KeyCode::Down));
        QuizManager::new(&mut app).handle_key(key(KeyCode::Enter));

        let state = app.session.state();
        assert_eq!(state.selected_index(), Some(1));
        assert!(state.validation().unwrap().correct);
    }

    #[test]
    fn wrong_answer_then_remediation_clears_and_reloads() {
        let mut app = app_with_question(Topic::Musculoskeletal);
        QuizManager::new(&mut app).handle_key(key(KeyCode::Char('1')));
        assert!(app.session.state().remediation_available());

        QuizManager::new(&mut app).handle_key(key(KeyCode::Char('n')));
        let state = app.session.state();
        assert!(state.loading);
        assert!(state.answer.is_none());
        assert!(state.current_question.is_none());
        assert_eq!(state.topic, Some(Topic::Musculoskeletal));
    }

    #[test]
    fn remediation_after_correct_answer_is_refused() {
        let mut app = app_with_question(Topic::Lymphatic);
        QuizManager::new(&mut app).handle_key(key(KeyCode::Char('2')));
        let before = app.session.state().clone();

        QuizManager::new(&mut app).handle_key(key(KeyCode::Char('n')));
        assert_eq!(app.session.state(), &before);
        assert_eq!(
            app.status.as_deref(),
            Some(
                QuizError::InvalidTransition(TransitionError::RemediationNotOffered)
                    .to_string()
                    .as_str()
            )
        );
    }

    #[test]
    fn only_t_returns_to_topics() {
        let mut app = app_with_question(Topic::Lymphatic);
        QuizManager::new(&mut app).handle_key(key(KeyCode::Char('m')));
        assert_eq!(app.view, AppView::Quiz);
        QuizManager::new(&mut app).handle_key(key(KeyCode::Char('t')));
        assert_eq!(app.view, AppView::Topics);
    }

    #[test]
    fn out_of_range_digit_is_refused() {
        let mut app = app_with_question(Topic::Genitourinary);
        QuizManager::new(&mut app).handle_key(key(KeyCode::Char('6')));
        assert!(app.session.state().answer.is_none());
        assert!(app.status.as_deref().unwrap().contains("out of range"));
    }

    #[test]
    fn second_answer_is_refused() {
        let mut app = app_with_question(Topic::Genitourinary);
        QuizManager::new(&mut app).handle_key(key(KeyCode::Char('1')));
        QuizManager::new(&mut app).handle_key(key(KeyCode::Char('2')));
        assert_eq!(app.session.state().selected_index(), Some(0));
        assert!(app.status.as_deref().unwrap().contains("already been answered"));
    }

    #[test]
    fn topic_requests_are_ignored_while_loading() {
        let mut app = offline_app();
        QuizManager::new(&mut app).start_topic(Topic::Integumentary);
        QuizManager::new(&mut app).start_topic(Topic::Lymphatic);
        assert_eq!(app.session.state().topic, Some(Topic::Integumentary));
    }

    #[test]
    fn missing_source_reports_error_without_touching_session() {
        let mut app = offline_app();
        app.question_source = None;
        QuizManager::new(&mut app).start_topic(Topic::Integumentary);
        assert!(app.error.is_some());
        assert!(app.session.state().topic.is_none());
        assert!(!app.session.state().loading);
    }
}
