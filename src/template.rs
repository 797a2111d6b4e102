//! Message templating and link tracking.
//!
//! CHANGELOG:
//! - 10/19/2026 - Rewrite only the link's query, leave the rest as typed
//! - 10/19/2026 - Initial implementation

use std::sync::OnceLock;

use regex::Regex;
use url::{form_urlencoded, Url};

use crate::contacts::phone::digits_only;

/// Placeholder replaced with the contact's first name.
pub const FIRST_NAME_PLACEHOLDER: &str = "{first_name}";

/// Query parameter used for link tracking unless overridden.
pub const DEFAULT_LINK_FIELD: &str = "cid";

/// Fill `{first_name}` in the template.
pub fn render(template: &str, first_name: &str) -> String {
    template.replace(FIRST_NAME_PLACEHOLDER, first_name.trim())
}

fn url_regex() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| Regex::new(r"https?://\S+").expect("static regex"))
}

/// Set `field=<digits of phone>` on the first http(s) link in `message`.
///
/// Only the query is rewritten; scheme, host, path and fragment are kept
/// exactly as written. Messages without a link, or whose link doesn't parse,
/// come back unchanged.
pub fn personalize_link(message: &str, phone: &str, field: &str) -> String {
    let Some(found) = url_regex().find(message) else {
        return message.to_string();
    };
    let link = found.as_str();
    if Url::parse(link).is_err() {
        return message.to_string();
    }

    let (body, fragment) = match link.find('#') {
        Some(i) => link.split_at(i),
        None => (link, ""),
    };
    let (base, query) = match body.split_once('?') {
        Some((base, query)) => (base, query),
        None => (body, ""),
    };

    let value = digits_only(phone);
    let mut replaced = false;
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        if k == field {
            replaced = true;
            serializer.append_pair(&k, &value);
        } else {
            serializer.append_pair(&k, &v);
        }
    }
    if !replaced {
        serializer.append_pair(field, &value);
    }

    format!(
        "{}{}?{}{}{}",
        &message[..found.start()],
        base,
        serializer.finish(),
        fragment,
        &message[found.end()..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_first_name() {
        assert_eq!(render("Hi {first_name}, see you!", " Ana "), "Hi Ana, see you!");
        assert_eq!(render("Hi {first_name}", ""), "Hi ");
        assert_eq!(render("No placeholder", "Bo"), "No placeholder");
    }

    #[test]
    fn test_link_gets_tracking_param() {
        let msg = personalize_link("Join https://example.com/signup today", "+14085551234", "cid");
        assert_eq!(msg, "Join https://example.com/signup?cid=14085551234 today");
    }

    #[test]
    fn test_existing_query_kept_and_field_replaced() {
        let msg = personalize_link(
            "Go: https://example.com/p?utm=sms&cid=old",
            "+14085551234",
            "cid",
        );
        assert_eq!(msg, "Go: https://example.com/p?utm=sms&cid=14085551234");
    }

    #[test]
    fn test_only_first_link_changed() {
        let msg = personalize_link(
            "https://a.example/x and https://b.example/y",
            "+15551234567",
            "ref",
        );
        assert_eq!(msg, "https://a.example/x?ref=15551234567 and https://b.example/y");
    }

    #[test]
    fn test_link_text_outside_query_untouched() {
        assert_eq!(
            personalize_link("https://Example.com", "+14085551234", "cid"),
            "https://Example.com?cid=14085551234"
        );
        assert_eq!(
            personalize_link("See https://x.example/Path/#top!", "+14085551234", "cid"),
            "See https://x.example/Path/?cid=14085551234#top!"
        );
    }

    #[test]
    fn test_no_link_unchanged() {
        assert_eq!(personalize_link("plain text", "+14085551234", "cid"), "plain text");
    }
}
