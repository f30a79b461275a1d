//! Core type definitions for Prospector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProspectorError, Result};

/// Default number of cards read per results page
pub const DEFAULT_MAX_CARDS_PER_PAGE: usize = 60;

/// Default number of connection invitations per results page
pub const DEFAULT_MAX_CONNECTS_PER_PAGE: usize = 3;

/// A profile captured from one search-result card
///
/// Every field is a plain string; an absent value is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub profile_url: String,
}

impl Contact {
    /// Field tuple in export column order
    pub fn fields(&self) -> [&str; 5] {
        [
            &self.name,
            &self.title,
            &self.company,
            &self.location,
            &self.profile_url,
        ]
    }
}

/// Login credentials, supplied once per run and never persisted
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Both fields are required and non-blank
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(ProspectorError::Auth("email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(ProspectorError::Auth("password is required".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parameters of a single run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    /// Search queries, processed in order
    pub queries: Vec<String>,

    #[serde(default = "default_max_cards")]
    pub max_cards_per_page: usize,

    /// Zero disables outreach entirely
    #[serde(default = "default_max_connects")]
    pub max_connects_per_page: usize,

    #[serde(default = "default_headless")]
    pub headless: bool,
}

fn default_max_cards() -> usize {
    DEFAULT_MAX_CARDS_PER_PAGE
}

fn default_max_connects() -> usize {
    DEFAULT_MAX_CONNECTS_PER_PAGE
}

fn default_headless() -> bool {
    true
}

impl RunConfiguration {
    /// Configuration with default page limits, running headless
    pub fn new<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queries: queries.into_iter().map(Into::into).collect(),
            max_cards_per_page: default_max_cards(),
            max_connects_per_page: default_max_connects(),
            headless: default_headless(),
        }
    }

    pub fn with_max_cards(mut self, max_cards: usize) -> Self {
        self.max_cards_per_page = max_cards;
        self
    }

    pub fn with_max_connects(mut self, max_connects: usize) -> Self {
        self.max_connects_per_page = max_connects;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.queries.is_empty() {
            return Err(ProspectorError::Config(
                "at least one query is required".to_string(),
            ));
        }
        if let Some(pos) = self.queries.iter().position(|q| q.trim().is_empty()) {
            return Err(ProspectorError::Config(format!(
                "query #{} is blank",
                pos + 1
            )));
        }
        if self.max_cards_per_page == 0 {
            return Err(ProspectorError::Config(
                "max_cards_per_page must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// One sent invitation, as persisted by the invite ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRecord {
    pub timestamp: DateTime<Utc>,
    pub user_email: String,
    pub profile_name: String,
    pub profile_title: String,
    pub company: String,
    pub location: String,
    #[serde(alias = "linkedin_url")]
    pub profile_url: String,
    #[serde(alias = "query")]
    pub source_query: String,
}

impl InviteRecord {
    pub fn from_contact(
        contact: &Contact,
        user_email: impl Into<String>,
        source_query: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            user_email: user_email.into(),
            profile_name: contact.name.clone(),
            profile_title: contact.title.clone(),
            company: contact.company.clone(),
            location: contact.location.clone(),
            profile_url: contact.profile_url.clone(),
            source_query: source_query.into(),
        }
    }
}
