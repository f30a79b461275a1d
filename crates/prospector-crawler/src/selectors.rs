//! Stable selectors and control labels for the search-results page

/// Wrapper of one result card
pub const CARD: &str = r#"div[data-view-name="search-entity-result-universal-template"]"#;

/// Link to a member profile
pub const PROFILE_LINK: &str = r#"a[href*="/in/"]"#;

/// Path marker that precedes the profile handle
pub const PROFILE_PATH_MARKER: &str = "/in/";

/// Container that signals the results page has rendered
pub const RESULTS_CONTAINER: &str = "main";

/// Candidate action controls inside a card
pub const CONTROLS: &str = "button, a";

pub const LOGIN_EMAIL: &str = r#"input[name="session_key"]"#;
pub const LOGIN_PASSWORD: &str = r#"input[name="session_password"]"#;
pub const LOGIN_SUBMIT: &str = r#"button[type="submit"]"#;

pub const LOGIN_PATH: &str = "/login";
pub const SEARCH_PATH: &str = "/search/results/people/";

/// Attribute written on each captured card by the capture script
pub const CARD_INDEX_ATTR: &str = "data-prospector-card";

/// Attribute written on the control that is about to be clicked
pub const ACTION_ATTR: &str = "data-prospector-action";

/// Class fragments that mark a card line as a subtitle
pub const SUBTITLE_CLASS_HINTS: &[&str] = &["primary-subtitle", "search-result__info"];

/// Visible labels of the connect control (exact, case-insensitive)
pub const CONNECT_LABELS: &[&str] = &["connect", "conectar"];

/// Visible labels of the invitation confirmation control
pub const SEND_LABELS: &[&str] = &[
    "send",
    "send now",
    "send without a note",
    "enviar",
    "enviar agora",
    "enviar sem nota",
];

/// Selector of the connect control tagged for card `index`
pub fn connect_target(index: usize) -> String {
    format!(r#"[{}="connect-{}"]"#, ACTION_ATTR, index)
}

/// Selector of the tagged confirmation control
pub fn send_target() -> String {
    format!(r#"[{}="send"]"#, ACTION_ATTR)
}
