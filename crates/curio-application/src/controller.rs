//! Conversation controller.
//!
//! Owns the transcript for one page visit and drives
//! resolver → start-of-session stream → reply streams, publishing
//! [`ConversationEvent`]s for whatever front end renders the conversation.

use curio_core::config::{CurioConfig, TypingSettings};
use curio_core::conversation::{ChunkStream, ConversationBackend, Message, Sender, Transcript};
use curio_core::error::{CurioError, Result};
use curio_core::session::{
    Answers, ResponseId, SubmissionReceipt, SurveyResponseRepository, first_unanswered,
};
use curio_core::state::{RespondentStore, completed_key};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::resolver::{Resolution, ResolvedSession, SessionResolver, SessionSource};
use crate::stream::run_exchange;

/// Conversation state for one page visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    Initializing,
    Streaming,
    AwaitingInput,
    /// Terminal: the survey is done for this respondent.
    Completed,
    /// Sticky until the next visit.
    Error { message: String },
}

/// Inputs to [`ConversationState::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// The resolver produced an in-progress session.
    SessionResolved,
    /// A response stream is open and being rendered.
    StreamOpened,
    /// Nothing is streaming and the respondent may type.
    InputReady,
    /// The respondent sent a reply.
    ReplySubmitted,
    /// Already completed, final reply count reached, or answers submitted.
    Complete,
    /// Resolution or creation failed; no further progress is possible.
    Fail(String),
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationState::Idle => write!(f, "idle"),
            ConversationState::Initializing => write!(f, "initializing"),
            ConversationState::Streaming => write!(f, "streaming"),
            ConversationState::AwaitingInput => write!(f, "awaiting_input"),
            ConversationState::Completed => write!(f, "completed"),
            ConversationState::Error { .. } => write!(f, "error"),
        }
    }
}

impl ConversationState {
    /// The single transition function of the conversation.
    pub fn transition(&self, event: &StateEvent) -> Result<ConversationState> {
        use ConversationState as S;
        use StateEvent as E;

        let next = match (self, event) {
            (S::Error { .. }, _) => None,
            (S::Completed, E::Complete) => Some(S::Completed),
            (S::Completed, _) => None,
            (_, E::Complete) => Some(S::Completed),
            (_, E::Fail(message)) => Some(S::Error {
                message: message.clone(),
            }),
            (S::Idle, E::SessionResolved) => Some(S::Initializing),
            (S::Initializing, E::StreamOpened) => Some(S::Streaming),
            (S::AwaitingInput, E::ReplySubmitted) => Some(S::Streaming),
            (S::Initializing | S::Streaming, E::InputReady) => Some(S::AwaitingInput),
            _ => None,
        };

        next.ok_or_else(|| CurioError::InvalidTransition {
            from: self.to_string(),
            event: format!("{:?}", event),
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationState::Completed | ConversationState::Error { .. })
    }
}

/// Everything a front end needs to render the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    StateChanged(ConversationState),
    /// Persisted messages restored for a recovered session, in order.
    TranscriptRestored(Vec<Message>),
    /// Newly revealed assistant text, in display order.
    DisplayAdvanced(String),
    MessageCommitted(Message),
    /// A stream failed or was cancelled; any partial text was still committed.
    StreamFailed(String),
    Notice(String),
}

/// Drives one page visit.
pub struct ConversationController {
    resolver: SessionResolver,
    backend: Arc<dyn ConversationBackend>,
    repository: Arc<dyn SurveyResponseRepository>,
    store: Arc<dyn RespondentStore>,
    typing: TypingSettings,
    final_answer_count: Option<usize>,
    state: ConversationState,
    transcript: Transcript,
    session: Option<ResolvedSession>,
    initialized: bool,
    submitted: bool,
    events: mpsc::UnboundedSender<ConversationEvent>,
}

impl ConversationController {
    /// Creates the controller and the receiving end of its event channel.
    pub fn new(
        resolver: SessionResolver,
        backend: Arc<dyn ConversationBackend>,
        repository: Arc<dyn SurveyResponseRepository>,
        store: Arc<dyn RespondentStore>,
        config: &CurioConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ConversationEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            resolver,
            backend,
            repository,
            store,
            typing: config.typing.clone(),
            final_answer_count: config.conversation.final_answer_count,
            state: ConversationState::Idle,
            transcript: Transcript::new(),
            session: None,
            initialized: false,
            submitted: false,
            events,
        };
        (controller, receiver)
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn session_id(&self) -> Option<ResponseId> {
        self.session.as_ref().map(|session| session.id)
    }

    pub fn resolver(&self) -> &SessionResolver {
        &self.resolver
    }

    /// Resolves the session and opens the conversation.
    ///
    /// Only the first call does anything. A recovered session with a
    /// persisted log resumes it instead of starting the conversation again.
    /// Returns an error only for a failure that ends the visit.
    pub async fn initialize(&mut self, cancel: &CancellationToken) -> Result<()> {
        if self.initialized {
            tracing::debug!(state = %self.state, "initialize called again, ignoring");
            return Ok(());
        }
        self.initialized = true;

        let session = match self.resolver.resolve().await {
            Ok(Resolution::Session(session)) => session,
            Ok(Resolution::AlreadyCompleted) => {
                self.notice("This survey has already been submitted.");
                return self.apply(StateEvent::Complete);
            }
            Ok(Resolution::Pending) => {
                tracing::debug!("resolution pending elsewhere");
                return Ok(());
            }
            Err(err) => {
                self.apply(StateEvent::Fail(err.to_string()))?;
                return Err(err);
            }
        };

        let session_id = session.id;
        let recovered = session.source != SessionSource::Created;
        self.session = Some(session);
        self.apply(StateEvent::SessionResolved)?;

        if recovered {
            self.rehydrate(session_id).await;
        }

        if !self.transcript.is_empty() {
            return self.settle();
        }

        match self.backend.start_conversation(session_id).await {
            Ok(stream) => {
                self.apply(StateEvent::StreamOpened)?;
                self.consume(stream, cancel).await
            }
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "failed to start conversation");
                self.emit(ConversationEvent::StreamFailed(err.to_string()));
                self.settle()
            }
        }
    }

    /// Sends a respondent reply and streams the assistant's answer.
    ///
    /// The reply is appended to the transcript before the network call.
    pub async fn submit_reply(&mut self, text: &str, cancel: &CancellationToken) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CurioError::validation("reply"));
        }
        let next = self.state.transition(&StateEvent::ReplySubmitted)?;
        let session_id = self.active_session_id()?;

        let message = self.transcript.append(Sender::Respondent, text).clone();
        self.emit(ConversationEvent::MessageCommitted(message));
        self.set_state(next);

        match self.backend.send_message(session_id, text).await {
            Ok(stream) => self.consume(stream, cancel).await,
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "failed to send reply");
                self.emit(ConversationEvent::StreamFailed(err.to_string()));
                self.settle()
            }
        }
    }

    /// Submits the final answers for the session.
    ///
    /// Missing required answers fail locally without any network call. A
    /// remote failure leaves the session in progress so the call can be retried.
    pub async fn submit_final_answers(
        &mut self,
        answers: &Answers,
        required: &[String],
    ) -> Result<SubmissionReceipt> {
        if let Some(question_id) = first_unanswered(answers, required) {
            return Err(CurioError::validation(question_id));
        }
        if self.submitted {
            return Err(CurioError::Submission(
                "answers were already submitted".to_string(),
            ));
        }
        if matches!(self.state, ConversationState::Streaming | ConversationState::Error { .. }) {
            return Err(CurioError::InvalidTransition {
                from: self.state.to_string(),
                event: "submit_final_answers".to_string(),
            });
        }
        let session_id = self.active_session_id()?;

        let receipt = match self.repository.submit_final_answers(session_id, answers).await {
            Ok(receipt) => receipt,
            Err(err) => {
                tracing::error!(session_id = %session_id, error = %err, "final submission failed");
                let err = CurioError::Submission(err.to_string());
                self.notice(err.to_string());
                return Err(err);
            }
        };

        self.submitted = true;
        let key = completed_key(self.resolver.survey_id());
        if let Err(err) = self.store.set(&key, "true").await {
            tracing::warn!(key = %key, error = %err, "failed to persist completed flag");
        }
        self.apply(StateEvent::Complete)?;
        Ok(receipt)
    }

    async fn rehydrate(&mut self, session_id: ResponseId) {
        match self.backend.list_messages(session_id).await {
            Ok(persisted) => {
                self.transcript = Transcript::rehydrate(persisted);
                tracing::info!(
                    session_id = %session_id,
                    messages = self.transcript.len(),
                    "restored conversation log"
                );
                if !self.transcript.is_empty() {
                    self.emit(ConversationEvent::TranscriptRestored(
                        self.transcript.messages().to_vec(),
                    ));
                }
            }
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "failed to load conversation log");
                self.notice("Earlier messages could not be loaded.");
            }
        }
    }

    async fn consume(&mut self, stream: ChunkStream, cancel: &CancellationToken) -> Result<()> {
        let events = self.events.clone();
        let outcome = run_exchange(stream, &self.typing, cancel, |revealed| {
            let _ = events.send(ConversationEvent::DisplayAdvanced(revealed.to_string()));
        })
        .await;

        tracing::debug!(
            chunk_count = outcome.chunk_count,
            committed = outcome.text.is_some(),
            "exchange finished"
        );

        if let Some(text) = outcome.text {
            let message = self.transcript.append(Sender::Assistant, text).clone();
            self.emit(ConversationEvent::MessageCommitted(message));
        }
        if let Some(err) = outcome.error {
            self.emit(ConversationEvent::StreamFailed(err.to_string()));
        }
        self.settle()
    }

    /// Leaves the streaming phase: complete once enough replies were answered,
    /// otherwise wait for input.
    fn settle(&mut self) -> Result<()> {
        let reached = self
            .final_answer_count
            .is_some_and(|count| self.transcript.respondent_turns() >= count);
        if reached {
            tracing::info!(
                replies = self.transcript.respondent_turns(),
                "final reply count reached"
            );
            self.apply(StateEvent::Complete)
        } else {
            self.apply(StateEvent::InputReady)
        }
    }

    fn active_session_id(&self) -> Result<ResponseId> {
        self.session
            .as_ref()
            .map(|session| session.id)
            .ok_or_else(|| CurioError::Submission("no active response session".to_string()))
    }

    fn apply(&mut self, event: StateEvent) -> Result<()> {
        let next = self.state.transition(&event)?;
        self.set_state(next);
        Ok(())
    }

    fn set_state(&mut self, next: ConversationState) {
        if next == self.state {
            return;
        }
        tracing::debug!(from = %self.state, to = %next, "conversation state changed");
        self.state = next.clone();
        self.emit(ConversationEvent::StateChanged(next));
    }

    fn notice(&self, message: impl Into<String>) {
        self.emit(ConversationEvent::Notice(message.into()));
    }

    fn emit(&self, event: ConversationEvent) {
        // A dropped receiver only means nobody is rendering.
        let _ = self.events.send(event);
    }
}
