//! Response session resolution.
//!
//! Produces the single response session id used for the rest of a page visit.
//! Signals are consulted in a fixed order:
//!
//! 1. the local "completed" flag for the survey (no network round trip),
//! 2. an explicit, well-formed session id in the URL,
//! 3. the stored respondent identifier, matched against the remote store,
//! 4. a new session, created at most once per visit.
//!
//! Later calls in the same visit return the memoized outcome.

use curio_core::error::{CurioError, Result};
use curio_core::route::{Navigation, RespondRoute};
use curio_core::session::{ResponseId, ResponseSession, SurveyId, SurveyResponseRepository};
use curio_core::state::{RespondentStore, completed_key, is_flag_set, respondent_key};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Which signal produced the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Session id taken from the URL path.
    Url,
    /// Matched through the stored respondent identifier.
    StoredRespondent,
    /// Freshly created for this visit.
    Created,
}

impl fmt::Display for SessionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionSource::Url => write!(f, "url"),
            SessionSource::StoredRespondent => write!(f, "stored_respondent"),
            SessionSource::Created => write!(f, "created"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub id: ResponseId,
    pub respondent_identifier: Option<String>,
    pub source: SessionSource,
}

/// Outcome of a resolution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An in-progress session to use for every later call.
    Session(ResolvedSession),
    /// The respondent already submitted this survey. Nothing may be mutated.
    AlreadyCompleted,
    /// Another resolution is still in flight; this call did nothing.
    Pending,
}

/// Resolves the response session for one page visit.
pub struct SessionResolver {
    route: RespondRoute,
    repository: Arc<dyn SurveyResponseRepository>,
    store: Arc<dyn RespondentStore>,
    in_flight: AtomicBool,
    create_attempted: AtomicBool,
    outcome: RwLock<Option<Result<Resolution>>>,
}

impl SessionResolver {
    pub fn new(
        route: RespondRoute,
        repository: Arc<dyn SurveyResponseRepository>,
        store: Arc<dyn RespondentStore>,
    ) -> Self {
        Self {
            route,
            repository,
            store,
            in_flight: AtomicBool::new(false),
            create_attempted: AtomicBool::new(false),
            outcome: RwLock::new(None),
        }
    }

    /// Parses the current location and, for a legacy link, rewrites it in
    /// place to the canonical shape before anything else happens.
    ///
    /// Meant to be called once per visit; the rewrite happens here only.
    pub fn for_location(
        navigation: &dyn Navigation,
        repository: Arc<dyn SurveyResponseRepository>,
        store: Arc<dyn RespondentStore>,
    ) -> Result<Self> {
        let location = navigation.current_location();
        let parsed = RespondRoute::parse(&location)?;
        if let Some(canonical) = parsed.rewrite.as_deref() {
            tracing::info!(from = %location, to = %canonical, "rewriting legacy respond link");
            navigation.replace_location(canonical);
        }
        Ok(Self::new(parsed.route, repository, store))
    }

    pub fn route(&self) -> &RespondRoute {
        &self.route
    }

    pub fn survey_id(&self) -> SurveyId {
        self.route.survey_id
    }

    /// Resolves the session, or returns the outcome of an earlier call.
    ///
    /// A call made while another is in flight returns [`Resolution::Pending`]
    /// without touching the store.
    pub async fn resolve(&self) -> Result<Resolution> {
        if let Some(outcome) = self.outcome.read().await.clone() {
            return outcome;
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!(survey_id = %self.survey_id(), "resolution already in flight");
            return Ok(Resolution::Pending);
        }

        // A call that finished between the read above and the swap wins.
        if let Some(outcome) = self.outcome.read().await.clone() {
            self.in_flight.store(false, Ordering::SeqCst);
            return outcome;
        }

        let outcome = self.resolve_uncached().await;
        *self.outcome.write().await = Some(outcome.clone());
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    async fn resolve_uncached(&self) -> Result<Resolution> {
        let survey_id = self.survey_id();

        if is_flag_set(self.read_store(&completed_key(survey_id)).await.as_deref()) {
            tracing::info!(survey_id = %survey_id, "survey marked completed locally");
            return Ok(Resolution::AlreadyCompleted);
        }

        if let Some(response_id) = self.route.response_id {
            if let Some(resolution) = self.resolve_from_url(response_id).await {
                return Ok(resolution);
            }
        }

        let stored = self
            .read_store(&respondent_key(survey_id))
            .await
            .filter(|identifier| !identifier.trim().is_empty());

        if let Some(identifier) = stored.as_deref() {
            match self
                .repository
                .find_latest_by_respondent(survey_id, identifier)
                .await
            {
                Ok(Some(session)) => return Ok(self.adopt(session, SessionSource::StoredRespondent).await),
                Ok(None) => {
                    tracing::debug!(survey_id = %survey_id, "stored respondent has no session yet");
                }
                Err(err) => {
                    tracing::warn!(
                        survey_id = %survey_id,
                        error = %err,
                        "respondent lookup failed, treating as new respondent"
                    );
                }
            }
        }

        self.create_session(stored.as_deref()).await
    }

    /// Step 1. `None` means "fall through to the next signal".
    async fn resolve_from_url(&self, response_id: ResponseId) -> Option<Resolution> {
        let survey_id = self.survey_id();
        match self.repository.find_by_id(response_id).await {
            Ok(Some(session)) if session.survey_id != survey_id => {
                tracing::warn!(
                    survey_id = %survey_id,
                    session_id = %response_id,
                    session_survey_id = %session.survey_id,
                    "session in URL belongs to another survey, ignoring"
                );
                None
            }
            Ok(Some(session)) => Some(self.adopt(session, SessionSource::Url).await),
            Ok(None) => {
                tracing::info!(session_id = %response_id, "session in URL not found, ignoring");
                None
            }
            Err(err) => {
                tracing::warn!(session_id = %response_id, error = %err, "session lookup failed, ignoring URL id");
                None
            }
        }
    }

    async fn adopt(&self, session: ResponseSession, source: SessionSource) -> Resolution {
        if session.is_completed() {
            tracing::info!(session_id = %session.id, %source, "session already completed");
            self.mark_completed().await;
            return Resolution::AlreadyCompleted;
        }
        tracing::info!(session_id = %session.id, %source, "reusing response session");
        Resolution::Session(ResolvedSession {
            id: session.id,
            respondent_identifier: session.respondent_identifier,
            source,
        })
    }

    /// Step 4. Runs at most once per visit; a failure is final.
    async fn create_session(&self, stored: Option<&str>) -> Result<Resolution> {
        let survey_id = self.survey_id();
        if self.create_attempted.swap(true, Ordering::SeqCst) {
            return Err(CurioError::SessionStart(
                "a session was already requested for this visit".to_string(),
            ));
        }

        let session = self
            .repository
            .create(survey_id, stored)
            .await
            .map_err(|err| {
                tracing::error!(survey_id = %survey_id, error = %err, "failed to create response session");
                CurioError::SessionStart(err.to_string())
            })?;

        let identifier = session
            .respondent_identifier
            .clone()
            .or_else(|| stored.map(str::to_string));

        if let Some(identifier) = identifier.as_deref() {
            if Some(identifier) != stored {
                if let Err(err) = self.store.set(&respondent_key(survey_id), identifier).await {
                    tracing::warn!(survey_id = %survey_id, error = %err, "failed to persist respondent identifier");
                }
            }
        }

        tracing::info!(survey_id = %survey_id, session_id = %session.id, "started new response session");
        Ok(Resolution::Session(ResolvedSession {
            id: session.id,
            respondent_identifier: identifier,
            source: SessionSource::Created,
        }))
    }

    async fn read_store(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "respondent store read failed");
                None
            }
        }
    }

    async fn mark_completed(&self) {
        let key = completed_key(self.survey_id());
        if let Err(err) = self.store.set(&key, "true").await {
            tracing::warn!(key = %key, error = %err, "failed to persist completed flag");
        }
    }
}
