//! Page scripts evaluated through the browser channel
//!
//! Every script is tagged (see [`prospector_browser::tagged_script`]) and
//! returns a primitive. Structured results come back as a JSON string that is
//! validated on the Rust side.

use crate::selectors;
use prospector_browser::tagged_script;

pub const TAG_CAPTURE: &str = "capture";
pub const TAG_COUNT_PROFILES: &str = "count-profiles";
pub const TAG_SCROLL: &str = "scroll";
pub const TAG_LOCATE_CONNECT: &str = "locate-connect";
pub const TAG_LOCATE_SEND: &str = "locate-send";
pub const TAG_CONCEAL_WINDOW: &str = "conceal-window";
pub const TAG_CURRENT_URL: &str = "current-url";

/// Pixels scrolled by one lazy-load pulse
const SCROLL_STEP_PX: u32 = 300;

fn js_string(value: &str) -> String {
    // serde_json string literals are valid JavaScript string literals
    serde_json::Value::String(value.to_string()).to_string()
}

fn js_string_array(values: &[&str]) -> String {
    serde_json::Value::from(values.to_vec()).to_string()
}

/// Tag every card with its DOM index and return `[{index, html, text}]`
pub fn capture_cards() -> String {
    let body = format!(
        r#"(() => {{
  const cards = Array.from(document.querySelectorAll({card}));
  return JSON.stringify(cards.map((card, index) => {{
    card.setAttribute({attr}, String(index));
    return {{ index, html: card.outerHTML, text: card.innerText || '' }};
  }}));
}})()"#,
        card = js_string(selectors::CARD),
        attr = js_string(selectors::CARD_INDEX_ATTR),
    );
    tagged_script(TAG_CAPTURE, &body)
}

/// Number of profile links currently in the document
pub fn count_profiles() -> String {
    let body = format!(
        "document.querySelectorAll({}).length",
        js_string(selectors::PROFILE_LINK)
    );
    tagged_script(TAG_COUNT_PROFILES, &body)
}

pub fn scroll_pulse() -> String {
    tagged_script(
        TAG_SCROLL,
        &format!("window.scrollBy(0, {}); true", SCROLL_STEP_PX),
    )
}

/// Find the connect control inside card `index` and tag it for clicking
pub fn locate_connect(index: usize) -> String {
    let body = format!(
        r#"(() => {{
  const labels = {labels};
  const card = document.querySelector('[' + {card_attr} + '="{index}"]');
  if (!card) return false;
  for (const control of card.querySelectorAll({controls})) {{
    const label = (control.innerText || '').trim().toLowerCase();
    if (labels.includes(label)) {{
      control.setAttribute({action_attr}, 'connect-{index}');
      return true;
    }}
  }}
  return false;
}})()"#,
        labels = js_string_array(selectors::CONNECT_LABELS),
        card_attr = js_string(selectors::CARD_INDEX_ATTR),
        controls = js_string(selectors::CONTROLS),
        action_attr = js_string(selectors::ACTION_ATTR),
        index = index,
    );
    tagged_script(TAG_LOCATE_CONNECT, &body)
}

/// Find the invitation confirmation control anywhere on the page and tag it
pub fn locate_send() -> String {
    let body = format!(
        r#"(() => {{
  const labels = {labels};
  for (const stale of document.querySelectorAll('[' + {action_attr} + '="send"]')) {{
    stale.removeAttribute({action_attr});
  }}
  for (const control of document.querySelectorAll({controls})) {{
    const label = (control.innerText || '').trim().toLowerCase();
    if (labels.includes(label)) {{
      control.setAttribute({action_attr}, 'send');
      return true;
    }}
  }}
  return false;
}})()"#,
        labels = js_string_array(selectors::SEND_LABELS),
        controls = js_string(selectors::CONTROLS),
        action_attr = js_string(selectors::ACTION_ATTR),
    );
    tagged_script(TAG_LOCATE_SEND, &body)
}

/// Move the window off-screen so a headed run stays out of the way
pub fn conceal_window() -> String {
    tagged_script(
        TAG_CONCEAL_WINDOW,
        r#"(() => {
  try {
    window.moveTo(-10000, -10000);
    window.resizeTo(1, 1);
    return true;
  } catch (e) {
    return false;
  }
})()"#,
    )
}

pub fn current_url() -> String {
    tagged_script(TAG_CURRENT_URL, "window.location.href")
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_browser::script_tag;

    #[test]
    fn test_scripts_are_tagged() {
        assert_eq!(script_tag(&capture_cards()), Some(TAG_CAPTURE));
        assert_eq!(script_tag(&count_profiles()), Some(TAG_COUNT_PROFILES));
        assert_eq!(script_tag(&scroll_pulse()), Some(TAG_SCROLL));
        assert_eq!(script_tag(&locate_connect(0)), Some(TAG_LOCATE_CONNECT));
        assert_eq!(script_tag(&locate_send()), Some(TAG_LOCATE_SEND));
        assert_eq!(script_tag(&conceal_window()), Some(TAG_CONCEAL_WINDOW));
        assert_eq!(script_tag(&current_url()), Some(TAG_CURRENT_URL));
    }

    #[test]
    fn test_capture_embeds_escaped_selector() {
        let script = capture_cards();
        assert!(script.contains(r#""div[data-view-name=\"search-entity-result-universal-template\"]""#));
        assert!(script.contains("JSON.stringify"));
    }

    #[test]
    fn test_locate_connect_targets_card() {
        let script = locate_connect(7);
        assert!(script.contains(r#"="7"]"#));
        assert!(script.contains("'connect-7'"));
        assert!(script.contains(r#"["connect","conectar"]"#));
    }
}
