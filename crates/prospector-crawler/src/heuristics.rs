//! Placement and location inference over the text of one card
//!
//! Cards carry no labelled fields, only a name link followed by loose lines of
//! text. The headline is split into title and company by an ordered table of
//! strategies; the first one that yields a non-empty company wins. Location is
//! found the same way. Everything here is pure so it can be tested on plain
//! strings.

use prospector_core::config::HeuristicConfig;
use prospector_core::{ProspectorError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Longest text accepted as a subtitle-derived company
const MAX_SUBTITLE_LEN: usize = 100;
/// Shortest text accepted as a subtitle-derived company
const MIN_SUBTITLE_LEN: usize = 3;

fn noise_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Presence badges: "Status is online", "O status está offline", "Online"
            r"(?i)^(?:(?:the|o)\s+)?status\s*(?:(?:is|está|esta)\b|:)\s*\S.*$",
            r"(?i)^(?:online|offline|off-line)$",
            // Button labels, matched as the whole line
            r"(?i)^\+?\s*(?:connect|conectar|message|mensagem|follow|seguir|following|seguindo|pending|pendente)$",
            r"(?i)\b(?:view|ver)\b.*\b(?:profile|perfil)\b",
            r"(?i)^\d[\d.,]*\s*\+?\s*(?:connections?|conex(?:ões|oes|ão|ao)|followers?|seguidores?)\b",
            r"(?i)\bmutual connections?\b|\bconex(?:ões|oes) em comum\b",
            r"(?i)\bdegree connection\b|\bgrau\b",
            r"(?i)^[•·]?\s*\d+(?:st|nd|rd|th|º)\+?$",
            r"^[•·|\-\s]+$",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("noise regex is valid"))
        .collect()
    })
}

/// A pipe, or a hyphen or dash with whitespace on both sides
///
/// Unspaced hyphens belong to words ("Co-founder", "Engineer-Acme") and never
/// split a headline.
fn separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\s*\|\s*|\s+[-–—]\s+").expect("separator regex is valid")
    })
}

fn region_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r",\s*[A-Z]{2}\b|^[A-Z]{2}$").expect("region code regex is valid")
    })
}

/// Whether a line of card text is UI chrome rather than profile content
///
/// Covers status badges, action-button labels, "view profile" phrases,
/// connection and follower counts, and connection-degree markers.
pub fn is_noise(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || noise_patterns().iter().any(|re| re.is_match(text))
}

/// Collapse runs of whitespace to single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One visible text fragment of a card, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateText {
    pub text: String,
    /// Rendered inside an element whose class marks it as a subtitle
    pub subtitle: bool,
}

impl CandidateText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            subtitle: false,
        }
    }

    pub fn subtitle(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            subtitle: true,
        }
    }
}

/// Everything the heuristics get to see of one card
#[derive(Debug, Clone, Copy)]
pub struct CardView<'a> {
    pub name: &'a str,
    /// Non-noise texts other than the name; the first is the headline
    pub candidates: &'a [CandidateText],
    /// The card's rendered text split into lines
    pub raw_lines: &'a [String],
}

impl<'a> CardView<'a> {
    fn headline(&self) -> Option<&'a str> {
        self.candidates.first().map(|c| c.text.as_str())
    }
}

/// Title and company inferred from a card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    pub title: String,
    pub company: String,
}

type PlacementStrategy = fn(&Heuristics, &CardView<'_>) -> Option<Placement>;
type LocationStrategy = fn(&Heuristics, &CardView<'_>) -> Option<String>;

/// Tried in order; the first placement with a company wins
const PLACEMENT_STRATEGIES: &[(&str, PlacementStrategy)] = &[
    ("separator", split_on_separator as PlacementStrategy),
    ("org-keyword", split_on_org_keyword as PlacementStrategy),
    ("subtitle", company_from_subtitle as PlacementStrategy),
    ("positional", company_from_second_text as PlacementStrategy),
];

const LOCATION_STRATEGIES: &[(&str, LocationStrategy)] = &[
    ("candidates", location_from_candidates as LocationStrategy),
    ("raw-lines", location_from_raw_lines as LocationStrategy),
];

/// Configured inference rules
#[derive(Debug, Clone)]
pub struct Heuristics {
    org_keywords: Vec<String>,
    countries: Option<Regex>,
}

impl Heuristics {
    pub fn new(config: &HeuristicConfig) -> Result<Self> {
        let org_keywords = config
            .org_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let names: Vec<String> = config
            .country_names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(regex::escape)
            .collect();
        let countries = if names.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)\b(?:{})\b", names.join("|"));
            Some(Regex::new(&pattern).map_err(|e| {
                ProspectorError::Config(format!("Invalid country list: {}", e))
            })?)
        };

        Ok(Self {
            org_keywords,
            countries,
        })
    }

    /// Split the headline into title and company
    pub fn place(&self, view: &CardView<'_>) -> Placement {
        for (name, strategy) in PLACEMENT_STRATEGIES {
            if let Some(placement) = strategy(self, view) {
                if !placement.company.is_empty() {
                    tracing::trace!(strategy = *name, "placement resolved");
                    return placement;
                }
            }
        }
        Placement {
            title: view.headline().unwrap_or_default().to_string(),
            company: String::new(),
        }
    }

    /// First text that looks like a location, or empty
    pub fn locate(&self, view: &CardView<'_>) -> String {
        LOCATION_STRATEGIES
            .iter()
            .find_map(|(_, strategy)| strategy(self, view))
            .unwrap_or_default()
    }

    /// A region code after a comma (`Recife, PE`) or a known country name
    pub fn looks_like_location(&self, text: &str) -> bool {
        if is_noise(text) {
            return false;
        }
        region_code_pattern().is_match(text)
            || self.countries.as_ref().is_some_and(|re| re.is_match(text))
    }

    fn is_org_keyword(&self, word: &str) -> bool {
        let word = word
            .trim_end_matches(|c| c == '.' || c == ',')
            .to_lowercase();
        self.org_keywords
            .iter()
            .any(|k| k.trim_end_matches(|c| c == '.' || c == ',') == word)
    }
}

fn split_on_separator(_: &Heuristics, view: &CardView<'_>) -> Option<Placement> {
    let headline = view.headline()?;
    let parts: Vec<&str> = separator_pattern()
        .split(headline)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 2 {
        return None;
    }
    Some(Placement {
        title: parts[0].to_string(),
        company: parts[1..].join(" - "),
    })
}

fn split_on_org_keyword(h: &Heuristics, view: &CardView<'_>) -> Option<Placement> {
    let headline = view.headline()?;
    let words: Vec<&str> = headline.split_whitespace().collect();
    if words.len() < 3 || !words.iter().any(|w| h.is_org_keyword(w)) {
        return None;
    }
    let mid = words.len() / 2;
    Some(Placement {
        title: words[..mid].join(" "),
        company: words[mid..].join(" "),
    })
}

fn company_from_subtitle(_: &Heuristics, view: &CardView<'_>) -> Option<Placement> {
    let headline = view.headline()?;
    let company = view.candidates.iter().skip(1).find(|c| {
        let len = c.text.chars().count();
        c.subtitle
            && (MIN_SUBTITLE_LEN..=MAX_SUBTITLE_LEN).contains(&len)
            && !is_noise(&c.text)
            && c.text != headline
    })?;
    Some(Placement {
        title: headline.to_string(),
        company: company.text.clone(),
    })
}

fn company_from_second_text(_: &Heuristics, view: &CardView<'_>) -> Option<Placement> {
    let headline = view.headline()?;
    let second = view.candidates.get(1)?;
    Some(Placement {
        title: headline.to_string(),
        company: second.text.clone(),
    })
}

fn location_from_candidates(h: &Heuristics, view: &CardView<'_>) -> Option<String> {
    view.candidates
        .iter()
        .map(|c| c.text.as_str())
        .find(|text| h.looks_like_location(text))
        .map(str::to_string)
}

fn location_from_raw_lines(h: &Heuristics, view: &CardView<'_>) -> Option<String> {
    view.raw_lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| *line != view.name)
        .find(|line| h.looks_like_location(line))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heuristics() -> Heuristics {
        Heuristics::new(&HeuristicConfig::default()).unwrap()
    }

    fn place(candidates: &[CandidateText]) -> Placement {
        let view = CardView {
            name: "Ana Souza",
            candidates,
            raw_lines: &[],
        };
        heuristics().place(&view)
    }

    #[test]
    fn test_noise_filter() {
        for noise in [
            "Status is online",
            "O status está offline",
            "Offline",
            "Connect",
            "+ Follow",
            "Pendente",
            "Message",
            "Seguir",
            "View Ana Souza’s profile",
            "Ver perfil de Ana",
            "500+ connections",
            "1.234 seguidores",
            "• 2nd",
            "3rd+",
            "2nd degree connection",
            "12 mutual connections",
            "•",
            "   ",
        ] {
            assert!(is_noise(noise), "expected noise: {:?}", noise);
        }
        for text in [
            "Sales Manager",
            "Connecting people at Acme",
            "Online Marketing Manager | Acme Corp",
            "Head of Online Sales",
            "Status Quo Consulting",
            "Status Isabel Partners",
            "Message Strategy Lead",
            "Follow-up Specialist",
            "Recife, PE",
            "Head of Growth | Beta Ltda",
        ] {
            assert!(!is_noise(text), "expected content: {:?}", text);
        }
    }

    #[test]
    fn test_separator_split() {
        let p = place(&[CandidateText::plain("Sales Manager | Acme Corp")]);
        assert_eq!(p.title, "Sales Manager");
        assert_eq!(p.company, "Acme Corp");

        let p = place(&[CandidateText::plain("CTO - Beta - Gamma Labs")]);
        assert_eq!(p.title, "CTO");
        assert_eq!(p.company, "Beta - Gamma Labs");

        let p = place(&[CandidateText::plain("Engenheira – Delta")]);
        assert_eq!(p.title, "Engenheira");
        assert_eq!(p.company, "Delta");
    }

    #[test]
    fn test_unspaced_hyphen_is_not_a_separator() {
        let p = place(&[CandidateText::plain("Co-founder")]);
        assert_eq!(p.title, "Co-founder");
        assert_eq!(p.company, "");

        let p = place(&[CandidateText::plain("Engineer-Acme")]);
        assert_eq!(p.title, "Engineer-Acme");
        assert_eq!(p.company, "");

        // A spaced hyphen elsewhere in the headline still splits
        let p = place(&[CandidateText::plain("Co-founder - Acme")]);
        assert_eq!(p.title, "Co-founder");
        assert_eq!(p.company, "Acme");
    }

    #[test]
    fn test_headline_with_status_word_is_kept() {
        let p = place(&[
            CandidateText::plain("Online Marketing Manager | Acme Corp"),
            CandidateText::plain("Recife, PE"),
        ]);
        assert_eq!(p.title, "Online Marketing Manager");
        assert_eq!(p.company, "Acme Corp");
    }

    #[test]
    fn test_org_keyword_split() {
        let p = place(&[CandidateText::plain("Diretor Comercial Grupo Alfa")]);
        assert_eq!(p.title, "Diretor Comercial");
        assert_eq!(p.company, "Grupo Alfa");

        let p = place(&[CandidateText::plain("Head of Sales Omega Inc.")]);
        assert_eq!(p.title, "Head of");
        assert_eq!(p.company, "Sales Omega Inc.");
    }

    #[test]
    fn test_org_keyword_needs_three_words() {
        let p = place(&[CandidateText::plain("Acme Inc")]);
        assert_eq!(p.title, "Acme Inc");
        assert_eq!(p.company, "");
    }

    #[test]
    fn test_subtitle_company() {
        let p = place(&[
            CandidateText::plain("Software Engineer"),
            CandidateText::plain("Recife, PE"),
            CandidateText::subtitle("Acme"),
        ]);
        assert_eq!(p.title, "Software Engineer");
        assert_eq!(p.company, "Acme");
    }

    #[test]
    fn test_subtitle_length_bounds() {
        let long = "x".repeat(MAX_SUBTITLE_LEN + 1);
        let p = place(&[
            CandidateText::plain("Software Engineer"),
            CandidateText::subtitle("ab"),
            CandidateText::subtitle(long),
        ]);
        // Falls through to the positional strategy
        assert_eq!(p.company, "ab");
    }

    #[test]
    fn test_positional_company() {
        let p = place(&[
            CandidateText::plain("Designer"),
            CandidateText::plain("Studio Nove"),
        ]);
        assert_eq!(p.title, "Designer");
        assert_eq!(p.company, "Studio Nove");
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(place(&[]), Placement::default());
    }

    #[test]
    fn test_location_from_region_code() {
        let h = heuristics();
        let candidates = [
            CandidateText::plain("Sales Manager | Acme"),
            CandidateText::plain("Recife, PE"),
        ];
        let view = CardView {
            name: "Ana",
            candidates: &candidates,
            raw_lines: &[],
        };
        assert_eq!(h.locate(&view), "Recife, PE");
    }

    #[test]
    fn test_location_from_country_in_raw_lines() {
        let h = heuristics();
        let candidates = [CandidateText::plain("Sales Manager")];
        let lines = vec![
            "Ana".to_string(),
            "Sales Manager".to_string(),
            "Greater Lisbon, Portugal".to_string(),
        ];
        let view = CardView {
            name: "Ana",
            candidates: &candidates,
            raw_lines: &lines,
        };
        assert_eq!(h.locate(&view), "Greater Lisbon, Portugal");
    }

    #[test]
    fn test_location_absent() {
        let h = heuristics();
        let candidates = [CandidateText::plain("sales manager, acme")];
        let view = CardView {
            name: "Ana",
            candidates: &candidates,
            raw_lines: &[],
        };
        assert_eq!(h.locate(&view), "");
    }

    #[test]
    fn test_empty_country_list() {
        let config = HeuristicConfig {
            country_names: Vec::new(),
            ..HeuristicConfig::default()
        };
        let h = Heuristics::new(&config).unwrap();
        assert!(!h.looks_like_location("Lisbon, Portugal"));
        assert!(h.looks_like_location("Austin, TX"));
    }
}
