use crate::{
    App, AppView, LOADING_FRAMES, config, quiz_session::{SessionPhase, SessionState}, topics::Topic,
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, List, ListItem, ListState, Paragraph, Wrap},
};

const HEADER_TITLE: &str = "NPTE MCQ Practice";

pub(crate) struct UiRenderer<'a> {
    app: &'a mut App,
}

impl<'a> UiRenderer<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn render(&mut self, frame: &mut Frame) {
        match self.app.view {
            AppView::Topics => self.render_topics(frame),
            AppView::Quiz => self.render_quiz(frame),
            AppView::Config => self.render_config(frame),
        }
    }

    fn render_topics(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::page_layout(frame.area());
        Self::render_header(frame, layout[0], Self::header_text(app));

        let items: Vec<ListItem> = Topic::ALL
            .iter()
            .enumerate()
            .map(|(index, topic)| ListItem::new(format!("{}. {}", index + 1, topic.label())))
            .collect();
        let mut list_state = ListState::default();
        list_state.select(Some(app.topic_index));

        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from("Please select one of the 9 NPTE topics")))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            layout[1],
            &mut list_state,
        );

        let mut status_lines = Self::common_status(app);
        status_lines.push("Use ↑/↓ or j/k to choose. Press Enter or 1-9 to get a question.".to_string());
        status_lines.push("Press x for a random topic, c to configure, q to quit.".to_string());
        if app.session.state().current_question.is_some() {
            status_lines.push("Press l to return to the current question.".to_string());
        }

        Self::render_status(frame, layout[2], status_lines);
    }

    fn render_quiz(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let state = app.session.state();
        let layout = Self::page_layout(frame.area());
        Self::render_header(frame, layout[0], Self::header_text(app));

        let main_sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(6)])
            .split(layout[1]);

        let question_text = Self::question_text(state, app.choice_cursor, app.loading_frame);
        let links_text = Self::links_text(state);

        frame.render_widget(
            Paragraph::new(question_text)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Question"))),
            main_sections[0],
        );

        frame.render_widget(
            Paragraph::new(links_text)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Learn more"))),
            main_sections[1],
        );

        let mut status_lines = Self::common_status(app);
        match state.phase() {
            SessionPhase::AwaitingAnswer if !state.loading => status_lines.push(
                "↑/↓ choose, Enter or 1-9 to answer. Press t for topics, q to quit.".to_string(),
            ),
            SessionPhase::Answered if state.remediation_available() => status_lines.push(
                "Press n to try another question on the same topic, t for topics.".to_string(),
            ),
            _ => status_lines.push("Press t for topics, q to quit.".to_string()),
        }

        Self::render_status(frame, layout[2], status_lines);
    }

    fn render_config(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::page_layout(frame.area());

        let config_path = config::config_file_path();
        let header_text = format!(
            "Config file: {}\nQuestion service URL: {}",
            config_path.display(),
            app.config_form.backend_url
        );
        Self::render_header(frame, layout[0], header_text);

        let items = vec![
            ListItem::new(format!(
                "Question source: {}",
                app.config_form.question_source.label()
            )),
            ListItem::new(format!(
                "OpenAI model: {}",
                app.config_form.openai_model.label()
            )),
            ListItem::new(format!(
                "Request timeout: {}s",
                app.config_form.request_timeout_secs
            )),
            ListItem::new(if app.config_form.is_editing_openai_key() {
                format!(
                    "OpenAI API key (editing): {}",
                    app.config_form.masked_openai_key_buffer()
                )
            } else {
                format!("OpenAI API key: {}", app.config_form.masked_openai_key())
            }),
        ];

        let mut list_state = ListState::default();
        list_state.select(Some(app.config_form.selected_index()));

        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from("Settings")))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            layout[1],
            &mut list_state,
        );

        let mut status_lines = Vec::new();
        if let Some(error) = &app.error {
            status_lines.push(format!("Error: {}", error));
        }
        status_lines.push(
            "↑/↓ or j/k choose field. ←/→ or h/l adjust value or cycle source/model.".to_string(),
        );
        status_lines.push(
            "Select \"OpenAI API key\" and press Enter to edit. Type to update, Enter to save, Esc to cancel.".to_string(),
        );
        status_lines
            .push("Press s to save, r to reset, m to save and return to the topics.".to_string());
        if app.config_form.dirty {
            status_lines.push("Unsaved changes".to_string());
        }
        if let Some(config_status) = &app.config_form.status {
            status_lines.push(config_status.clone());
        }

        Self::render_status(frame, layout[2], status_lines);
    }

    fn page_layout(area: Rect) -> std::rc::Rc<[Rect]> {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(6),
                Constraint::Length(5),
            ])
            .split(area)
    }

    fn render_header(frame: &mut Frame, area: Rect, text: String) {
        let title = Line::from(HEADER_TITLE).bold().blue().centered();
        frame.render_widget(
            Paragraph::new(text)
                .block(Block::bordered().title(title))
                .centered(),
            area,
        );
    }

    fn render_status(frame: &mut Frame, area: Rect, lines: Vec<String>) {
        frame.render_widget(
            Paragraph::new(lines.join("\n"))
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Status"))),
            area,
        );
    }

    fn common_status(app: &App) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(error) = &app.error {
            lines.push(format!("Error: {}", error));
        }
        if let Some(error) = &app.session.state().error {
            lines.push(format!("Error: {}", error));
        }
        if let Some(status) = &app.status {
            lines.push(status.clone());
        }
        lines
    }

    fn header_text(app: &App) -> String {
        let topic_line = match app.session.state().topic {
            Some(topic) => format!("Topic: {}", topic.label()),
            None => "Topic: <none>".to_string(),
        };
        let source_line = match &app.question_source {
            Some(source) => format!("Source: {}", source.label()),
            None => "Source: <unavailable>".to_string(),
        };
        format!("{}\n{}", topic_line, source_line)
    }

    pub(crate) fn question_text(state: &SessionState, cursor: usize, loading_frame: usize) -> String {
        if state.loading {
            let frame_symbol = LOADING_FRAMES[loading_frame % LOADING_FRAMES.len()];
            let topic = state.topic.map(Topic::label).unwrap_or("the selected topic");
            return format!("{} Generating a question on {}…", frame_symbol, topic);
        }

        let Some(question) = state.current_question.as_ref() else {
            return match &state.error {
                Some(_) => String::from("No question available. Pick a topic to try again."),
                None => String::from("No question yet. Pick a topic from the list."),
            };
        };

        let selected = state.selected_index();
        let mut lines = vec![question.stem().to_string(), String::new()];
        for (index, choice) in question.choices().iter().enumerate() {
            let marker = match selected {
                Some(_) if index == question.correct_index() => "[✓]",
                Some(chosen) if index == chosen => "[✗]",
                _ => "[ ]",
            };
            let prefix = if selected.is_none() && index == cursor {
                "▶"
            } else {
                " "
            };
            lines.push(format!("{} {} {}. {}", prefix, marker, index + 1, choice));
        }

        if let Some(validation) = state.validation() {
            lines.push(String::new());
            lines.push(validation.explanation.clone());
            lines.push(format!(
                "Mastery: {:.0}%",
                validation.mastery_level * 100.0
            ));
        }

        lines.join("\n")
    }

    pub(crate) fn links_text(state: &SessionState) -> String {
        let (Some(question), Some(answer)) = (state.current_question.as_ref(), state.answer.as_ref())
        else {
            return String::from("Links appear after an incorrect answer.");
        };
        if answer.validation.correct {
            return String::from("No additional resources needed.");
        }

        let links = question.links_for(answer.index);
        if links.is_empty() {
            String::from("No additional resources provided.")
        } else {
            links
                .iter()
                .enumerate()
                .map(|(index, url)| format!("{}. {}", index + 1, url))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{question::sample_payload, quiz_session::QuizSession};

    fn answered(index: usize) -> QuizSession {
        let mut session = QuizSession::new();
        let ticket = session.begin_topic(Topic::Musculoskeletal);
        let mut payload = sample_payload();
        payload
            .links
            .insert(0, vec!["https://www.orthopt.org".to_string()]);
        session.fetch_succeeded(ticket.id, payload);
        session.select_option(index).unwrap();
        session
    }

    #[test]
    fn loading_text_names_the_topic() {
        let mut session = QuizSession::new();
        session.begin_topic(Topic::Lymphatic);
        let text = UiRenderer::question_text(session.state(), 0, 1);
        assert!(text.starts_with("\\ Generating a question on Lymphatic system"));
    }

    #[test]
    fn answered_question_marks_choices_and_shows_feedback() {
        let session = answered(0);
        let text = UiRenderer::question_text(session.state(), 0, 0);
        assert!(text.contains("[✗] 1. a"));
        assert!(text.contains("[✓] 2. b"));
        assert!(text.contains("[ ] 3. c"));
        assert!(text.contains("The correct answer is: b."));
        assert!(text.contains("Mastery: 20%"));
    }

    #[test]
    fn links_follow_the_wrong_choice() {
        assert_eq!(
            UiRenderer::links_text(answered(0).state()),
            "1. https://www.orthopt.org"
        );
        assert_eq!(
            UiRenderer::links_text(answered(1).state()),
            "No additional resources needed."
        );
        assert_eq!(
            UiRenderer::links_text(answered(2).state()),
            "No additional resources provided."
        );
    }
}
