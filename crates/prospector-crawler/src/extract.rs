//! Turn captured card markup into contacts
//!
//! The capture script hands back each card's outer HTML and rendered text.
//! That payload is validated here and each card is parsed with `scraper`; the
//! text inference itself lives in [`crate::heuristics`].

use crate::dedup::normalize_profile_url;
use crate::heuristics::{collapse_whitespace, is_noise, CandidateText, CardView, Heuristics};
use crate::selectors::{PROFILE_LINK, SUBTITLE_CLASS_HINTS};
use prospector_core::config::HeuristicConfig;
use prospector_core::{Contact, ProspectorError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

/// One card as returned by the capture script
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawCard {
    /// DOM index, also written on the card as an attribute
    pub index: usize,
    pub html: String,
    #[serde(default)]
    pub text: String,
}

/// A contact together with the DOM index of the card it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCard {
    pub index: usize,
    pub contact: Contact,
}

/// Validate the capture script's result
///
/// Accepts the JSON string the script produces, or an already-decoded array.
pub fn parse_capture_payload(value: &Value) -> Result<Vec<RawCard>> {
    let cards = match value {
        Value::String(json) => serde_json::from_str(json),
        Value::Array(_) => serde_json::from_value(value.clone()),
        Value::Null => {
            return Err(ProspectorError::Extraction(
                "capture script returned no value".to_string(),
            ))
        }
        other => {
            return Err(ProspectorError::Extraction(format!(
                "unexpected capture payload: {}",
                other
            )))
        }
    };
    cards.map_err(|e| ProspectorError::Extraction(format!("malformed capture payload: {}", e)))
}

fn profile_phrase_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?i)^\s*(?:view profile of|ver perfil de)\s*")
                .expect("profile prefix regex is valid"),
            Regex::new(r"(?i)\s*\b(?:view profile|ver perfil)\b.*$")
                .expect("profile suffix regex is valid"),
        ]
    })
}

fn strip_profile_phrases(text: &str) -> String {
    let [prefix, suffix] = profile_phrase_patterns();
    let text = prefix.replace(text, "");
    suffix.replace(&text, "").trim().to_string()
}

fn has_ancestor(node: &ElementRef<'_>, pred: impl Fn(&scraper::node::Element) -> bool) -> bool {
    node.ancestors()
        .filter_map(|n| n.value().as_element())
        .any(pred)
}

fn text_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
}

/// Parses cards against a site
#[derive(Debug, Clone)]
pub struct Extractor {
    heuristics: Heuristics,
    base_url: Url,
    profile_link: Selector,
}

impl Extractor {
    pub fn new(config: &HeuristicConfig, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProspectorError::Config(format!("Invalid base URL {}: {}", base_url, e)))?;
        let profile_link = Selector::parse(PROFILE_LINK)
            .map_err(|e| ProspectorError::Config(format!("Invalid profile selector: {:?}", e)))?;

        Ok(Self {
            heuristics: Heuristics::new(config)?,
            base_url,
            profile_link,
        })
    }

    /// Contacts from the first `max_cards` cards that carry a profile link
    pub fn extract_page(&self, cards: &[RawCard], max_cards: usize) -> Vec<CapturedCard> {
        cards
            .iter()
            .filter_map(|card| {
                let contact = self.extract(card);
                if contact.is_none() {
                    debug!(index = card.index, "card has no profile link, skipping");
                }
                contact.map(|contact| CapturedCard {
                    index: card.index,
                    contact,
                })
            })
            .take(max_cards)
            .collect()
    }

    /// Parse one card; `None` when it has no profile link
    pub fn extract(&self, card: &RawCard) -> Option<Contact> {
        let fragment = Html::parse_fragment(&card.html);
        let link = fragment.select(&self.profile_link).next()?;
        let href = link.value().attr("href")?;

        let name = link
            .text()
            .flat_map(text_lines)
            .map(|line| strip_profile_phrases(&line))
            .find(|line| !line.is_empty())
            .unwrap_or_default();

        let candidates = self.candidate_texts(&fragment, &name);
        let mut raw_lines: Vec<String> = text_lines(&card.text).collect();
        if raw_lines.is_empty() {
            raw_lines = fragment
                .root_element()
                .text()
                .flat_map(text_lines)
                .collect();
        }

        let view = CardView {
            name: &name,
            candidates: &candidates,
            raw_lines: &raw_lines,
        };
        let placement = self.heuristics.place(&view);
        let location = self.heuristics.locate(&view);

        Some(Contact {
            profile_url: self.resolve(href),
            name,
            title: placement.title,
            company: placement.company,
            location,
        })
    }

    fn resolve(&self, href: &str) -> String {
        let absolute = match self.base_url.join(href.trim()) {
            Ok(url) => url.to_string(),
            Err(_) => href.trim().to_string(),
        };
        normalize_profile_url(&absolute)
    }

    fn candidate_texts(&self, fragment: &Html, name: &str) -> Vec<CandidateText> {
        let mut out = Vec::new();
        for node in fragment.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            let hidden = parent.value().name() == "script"
                || parent.value().name() == "style"
                || has_ancestor(&parent, |e| matches!(e.name(), "script" | "style" | "template"));
            if hidden {
                continue;
            }

            let subtitle = std::iter::once(parent.value())
                .chain(parent.ancestors().filter_map(|n| n.value().as_element()))
                .any(|element| {
                    element.classes().any(|class| {
                        SUBTITLE_CLASS_HINTS.iter().any(|hint| class.contains(hint))
                    })
                });

            for line in text_lines(text) {
                if line == name || is_noise(&line) {
                    continue;
                }
                out.push(CandidateText {
                    text: line,
                    subtitle,
                });
            }
        }
        out
    }
}
