use crate::{
    error::{FetchError, QuizError, TransitionError},
    evaluator::{AnswerValidation, evaluate},
    log_util::log_debug,
    question::{Question, QuestionPayload},
    topics::Topic,
};

/// Sequence stamp handed out when a fetch starts. Only the latest one may change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchId(u64);

/// What the caller needs to run a gateway request for the fetch that just started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: FetchId,
    pub topic: Topic,
}

/// The user's answer to the current question together with its evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedAnswer {
    pub index: usize,
    pub validation: AnswerValidation,
}

/// Rendering hint derived from the state fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingAnswer,
    Answered,
}

/// Read-only view of the session handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub topic: Option<Topic>,
    pub current_question: Option<Question>,
    pub answer: Option<SelectedAnswer>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    pub fn selected_index(&self) -> Option<usize> {
        self.answer.as_ref().map(|answer| answer.index)
    }

    pub fn validation(&self) -> Option<&AnswerValidation> {
        self.answer.as_ref().map(|answer| &answer.validation)
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.current_question, &self.answer) {
            (None, _) => SessionPhase::Idle,
            (Some(_), None) => SessionPhase::AwaitingAnswer,
            (Some(_), Some(_)) => SessionPhase::Answered,
        }
    }

    pub fn remediation_available(&self) -> bool {
        self.topic.is_some()
            && self
                .validation()
                .is_some_and(|validation| validation.suggest_remediation)
    }

    fn clear_question(&mut self) {
        self.current_question = None;
        self.answer = None;
        self.error = None;
    }
}

/// How a fetch completion was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Installed,
    Failed(FetchError),
    /// The fetch is no longer current (superseded or already applied); the result was dropped.
    Stale,
}

/// Owns the session state and applies the quiz transitions in order.
#[derive(Debug, Default)]
pub struct QuizSession {
    state: SessionState,
    latest_fetch: Option<FetchId>,
    next_fetch: u64,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Record the topic and drop whatever question was on screen. A fetch still in flight stops
    /// being current, so its late result comes back `Stale`.
    pub fn choose_topic(&mut self, topic: Topic) {
        if let Some(pending) = self.latest_fetch.take() {
            log_debug(&format!(
                "QuizSession: topic change abandons fetch {}",
                pending.0
            ));
        }
        self.state.loading = false;
        self.state.topic = Some(topic);
        self.state.clear_question();
        log_debug(&format!("QuizSession: topic chosen: {}", topic));
    }

    /// Stamp a new fetch. Any fetch started earlier loses the right to update the session, and a
    /// fetch stops being current once its result has been applied.
    pub fn fetch_started(&mut self) -> FetchId {
        self.next_fetch += 1;
        let id = FetchId(self.next_fetch);
        if self.state.loading {
            log_debug(&format!(
                "QuizSession: fetch {} supersedes {:?}",
                id.0, self.latest_fetch
            ));
        }
        self.latest_fetch = Some(id);
        self.state.loading = true;
        self.state.error = None;
        id
    }

    /// Choose a topic and start fetching a question for it.
    pub fn begin_topic(&mut self, topic: Topic) -> FetchTicket {
        self.choose_topic(topic);
        let id = self.fetch_started();
        FetchTicket { id, topic }
    }

    pub fn fetch_succeeded(&mut self, id: FetchId, payload: QuestionPayload) -> FetchOutcome {
        if !self.is_latest(id) {
            log_debug(&format!("QuizSession: discarded stale question for fetch {}", id.0));
            return FetchOutcome::Stale;
        }

        match Question::try_from(payload) {
            Ok(question) => {
                log_debug(&format!(
                    "QuizSession: installed question with {} choice(s) from fetch {}",
                    question.choice_count(),
                    id.0
                ));
                self.state.current_question = Some(question);
                self.state.answer = None;
                self.state.error = None;
                self.finish_latest();
                FetchOutcome::Installed
            }
            Err(err) => self.apply_failure(err),
        }
    }

    pub fn fetch_failed(&mut self, id: FetchId, error: FetchError) -> FetchOutcome {
        if !self.is_latest(id) {
            log_debug(&format!(
                "QuizSession: discarded stale {} failure for fetch {}",
                error.kind(),
                id.0
            ));
            return FetchOutcome::Stale;
        }
        self.apply_failure(error)
    }

    /// Apply a gateway result to the session.
    pub fn complete_fetch(
        &mut self,
        id: FetchId,
        result: Result<QuestionPayload, FetchError>,
    ) -> FetchOutcome {
        match result {
            Ok(payload) => self.fetch_succeeded(id, payload),
            Err(error) => self.fetch_failed(id, error),
        }
    }

    /// Answer the current question. An answer is final until the next question is installed.
    pub fn select_option(&mut self, index: usize) -> Result<&AnswerValidation, QuizError> {
        let question = self
            .state
            .current_question
            .as_ref()
            .ok_or(TransitionError::NoQuestion)?;
        if self.state.answer.is_some() {
            return Err(TransitionError::AlreadyAnswered.into());
        }
        if index >= question.choice_count() {
            return Err(TransitionError::OptionOutOfRange {
                index,
                len: question.choice_count(),
            }
            .into());
        }
        if self.state.loading {
            return Err(TransitionError::FetchInFlight.into());
        }

        let validation = evaluate(question, index);
        log_debug(&format!(
            "QuizSession: option {} selected (correct: {}, mastery: {:.1})",
            index, validation.correct, validation.mastery_level
        ));
        self.state.error = None;
        let answer = self
            .state
            .answer
            .insert(SelectedAnswer { index, validation });
        Ok(&answer.validation)
    }

    /// Ask for another question on the same topic after an incorrect answer.
    pub fn request_remediation(&mut self) -> Result<FetchTicket, QuizError> {
        let suggested = self
            .state
            .validation()
            .is_some_and(|validation| validation.suggest_remediation);
        if !suggested {
            return Err(TransitionError::RemediationNotOffered.into());
        }
        let topic = self.state.topic.ok_or(TransitionError::NoTopic)?;

        self.state.clear_question();
        log_debug(&format!("QuizSession: remediation requested for {}", topic));
        let id = self.fetch_started();
        Ok(FetchTicket { id, topic })
    }

    fn is_latest(&self, id: FetchId) -> bool {
        self.latest_fetch == Some(id)
    }

    fn finish_latest(&mut self) {
        self.latest_fetch = None;
        self.state.loading = false;
    }

    fn apply_failure(&mut self, error: FetchError) -> FetchOutcome {
        log_debug(&format!(
            "QuizSession: fetch failed ({}): {}",
            error.kind(),
            error
        ));
        self.state.error = Some(error.to_string());
        self.finish_latest();
        FetchOutcome::Failed(error)
    }
}
