use super::{config_manager::ConfigManager, quiz_manager::QuizManager};
use crate::{App, AppView, topics::Topic};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct TopicsManager<'a> {
    app: &'a mut App,
}

impl<'a> TopicsManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.topic_next(),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.topic_previous(),
            (KeyModifiers::NONE, KeyCode::Enter) => self.activate_topic(),
            (KeyModifiers::NONE, KeyCode::Char(digit @ '1'..='9')) => {
                self.app.topic_index = digit as usize - '1' as usize;
                self.activate_topic();
            }
            (KeyModifiers::NONE, KeyCode::Char('x')) => {
                let topic = Topic::random();
                self.app.topic_index = topic.index();
                self.activate_topic();
            }
            (KeyModifiers::NONE, KeyCode::Char('c') | KeyCode::Char('C')) => {
                ConfigManager::new(self.app).show_config()
            }
            (KeyModifiers::NONE, KeyCode::Char('l')) => self.resume_quiz(),
            _ => {}
        }
    }

    fn topic_next(&mut self) {
        self.app.topic_index = (self.app.topic_index + 1) % Topic::ALL.len();
    }

    fn topic_previous(&mut self) {
        if self.app.topic_index == 0 {
            self.app.topic_index = Topic::ALL.len() - 1;
        } else {
            self.app.topic_index -= 1;
        }
    }

    fn activate_topic(&mut self) {
        let topic = Topic::ALL[self.app.topic_index % Topic::ALL.len()];
        QuizManager::new(self.app).start_topic(topic);
    }

    /// Go back to the question on screen without requesting a new one.
    fn resume_quiz(&mut self) {
        let state = self.app.session.state();
        if state.current_question.is_some() || state.loading {
            self.app.view = AppView::Quiz;
        } else {
            self.app.status = Some("No question yet. Pick a topic first.".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{key, offline_app};

    #[test]
    fn navigation_wraps_around_the_nine_topics() {
        let mut app = offline_app();
        TopicsManager::new(&mut app).handle_key(key(KeyCode::Up));
        assert_eq!(app.topic_index, 8);
        TopicsManager::new(&mut app).handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.topic_index, 0);
    }

    #[test]
    fn enter_requests_a_question_for_the_highlighted_topic() {
        let mut app = offline_app();
        app.topic_index = 1;
        TopicsManager::new(&mut app).handle_key(key(KeyCode::Enter));

        let state = app.session.state();
        assert_eq!(state.topic, Some(Topic::Musculoskeletal));
        assert!(state.loading);
        assert_eq!(app.view, AppView::Quiz);
    }

    #[test]
    fn digit_keys_pick_topics_directly() {
        let mut app = offline_app();
        TopicsManager::new(&mut app).handle_key(key(KeyCode::Char('9')));
        assert_eq!(app.session.state().topic, Some(Topic::SystemInteractions));
    }

    #[test]
    fn resume_without_question_only_sets_status() {
        let mut app = offline_app();
        TopicsManager::new(&mut app).handle_key(key(KeyCode::Char('l')));
        assert_eq!(app.view, AppView::Topics);
        assert!(app.status.is_some());
    }
}
