//! Respond-mode route parsing.
//!
//! Canonical shape: `/survey/{surveyId}/respond[/{responseId}]`, optionally
//! carrying a `?token=` share-link token. The legacy shape
//! `/survey-response/{surveyId}[/{responseId}]` is still recognized and
//! rewritten to the canonical one.

use url::Url;

use crate::error::{CurioError, Result};
use crate::session::{ResponseId, SurveyId};

const CANONICAL_PREFIX: &str = "survey";
const CANONICAL_SUFFIX: &str = "respond";
const LEGACY_PREFIX: &str = "survey-response";
const SHARE_TOKEN_PARAM: &str = "token";

// Relative locations ("/survey/1/respond") are resolved against this base and
// stripped again when rendered.
const PLACEHOLDER_BASE: &str = "http://curio.invalid/";

/// Browser navigation state the resolver may rewrite in place.
pub trait Navigation: Send + Sync {
    fn current_location(&self) -> String;

    /// Replaces the current location without adding a history entry.
    fn replace_location(&self, location: &str);
}

/// A respond-mode route after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespondRoute {
    pub survey_id: SurveyId,
    /// Explicit session id from the path, only when well-formed.
    pub response_id: Option<ResponseId>,
    /// Opaque share-link token. A hint that this is a shareable link, never an identifier.
    pub share_token: Option<String>,
}

/// Result of parsing the current location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub route: RespondRoute,
    /// Canonical location to navigate to when the input used the legacy shape.
    pub rewrite: Option<String>,
}

impl RespondRoute {
    /// Parses an absolute URL or a root-relative path.
    pub fn parse(location: &str) -> Result<ParsedLocation> {
        let (mut url, relative) = match Url::parse(location) {
            Ok(url) => (url, false),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                (Url::parse(PLACEHOLDER_BASE)?.join(location)?, true)
            }
            Err(err) => return Err(err.into()),
        };

        let segments: Vec<String> = url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let share_token = url
            .query_pairs()
            .find(|(key, _)| key == SHARE_TOKEN_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        let (survey_segment, response_segment, legacy) = match segments.as_slice() {
            [prefix, survey, suffix] if prefix == CANONICAL_PREFIX && suffix == CANONICAL_SUFFIX => {
                (survey, None, false)
            }
            [prefix, survey, suffix, response]
                if prefix == CANONICAL_PREFIX && suffix == CANONICAL_SUFFIX =>
            {
                (survey, Some(response), false)
            }
            [prefix, survey] if prefix == LEGACY_PREFIX => (survey, None, true),
            [prefix, survey, response] if prefix == LEGACY_PREFIX => (survey, Some(response), true),
            _ => return Err(CurioError::not_found("respond route", location)),
        };

        let survey_id: SurveyId = survey_segment.parse()?;
        let response_id = response_segment.and_then(|raw| raw.parse::<ResponseId>().ok());

        let route = RespondRoute {
            survey_id,
            response_id,
            share_token,
        };

        let rewrite = if legacy {
            url.set_path(&route.canonical_path());
            Some(render(&url, relative))
        } else {
            None
        };

        Ok(ParsedLocation { route, rewrite })
    }

    /// Canonical path for this route, without query.
    pub fn canonical_path(&self) -> String {
        match self.response_id {
            Some(response_id) => format!(
                "/{}/{}/{}/{}",
                CANONICAL_PREFIX, self.survey_id, CANONICAL_SUFFIX, response_id
            ),
            None => format!("/{}/{}/{}", CANONICAL_PREFIX, self.survey_id, CANONICAL_SUFFIX),
        }
    }
}

fn render(url: &Url, relative: bool) -> String {
    if !relative {
        return url.to_string();
    }
    let mut rendered = url.path().to_string();
    if let Some(query) = url.query() {
        rendered.push('?');
        rendered.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        rendered.push('#');
        rendered.push_str(fragment);
    }
    rendered
}
