//! Profile URL normalization and duplicate removal

use crate::selectors::PROFILE_PATH_MARKER;
use prospector_core::Contact;
use std::collections::HashSet;

/// Canonical form of a profile URL
///
/// Drops the query string and fragment, then keeps everything through the
/// `/in/` marker plus the handle with surrounding slashes trimmed. URLs
/// without the marker only lose their query string and trailing slash.
pub fn normalize_profile_url(raw: &str) -> String {
    let raw = raw.trim();
    let without_query = raw
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    match without_query.find(PROFILE_PATH_MARKER) {
        Some(pos) => {
            let (prefix, rest) = without_query.split_at(pos + PROFILE_PATH_MARKER.len());
            let handle = rest
                .trim_matches('/')
                .split('/')
                .next()
                .unwrap_or_default();
            format!("{}{}", prefix, handle)
        }
        None => without_query.trim_end_matches('/').to_string(),
    }
}

/// The string used to decide whether two contacts are the same person
pub fn dedup_key(contact: &Contact) -> String {
    let url = normalize_profile_url(&contact.profile_url);
    if url.is_empty() {
        format!("{}|{}", contact.name, contact.company).to_lowercase()
    } else {
        url.to_lowercase()
    }
}

/// Remove later duplicates, keeping first-seen order
pub fn dedup(contacts: Vec<Contact>) -> Vec<Contact> {
    let mut seen = HashSet::with_capacity(contacts.len());
    contacts
        .into_iter()
        .filter(|contact| seen.insert(dedup_key(contact)))
        .collect()
}
