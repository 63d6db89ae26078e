//! Fallback values used when an activity payload leaves a field out.
//!
//! | Field       | Fallback                          |
//! |-------------|-----------------------------------|
//! | category    | `"Unknown"`                       |
//! | view path   | `"/"`                             |
//! | action name | verb, else name, else `"Unknown"` |
//!
//! Only absent values fall back. An empty string is kept as given.

pub const UNKNOWN_CATEGORY: &str = "Unknown";
pub const ROOT_PATH: &str = "/";

pub fn event_category(category: Option<&str>) -> &str {
    category.unwrap_or(UNKNOWN_CATEGORY)
}

pub fn view_path(path: Option<&str>) -> &str {
    path.unwrap_or(ROOT_PATH)
}

pub fn action_name<'a>(verb: Option<&'a str>, name: Option<&'a str>) -> &'a str {
    verb.or(name).unwrap_or(UNKNOWN_CATEGORY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_defaults_to_unknown() {
        assert_eq!(event_category(None), "Unknown");
        assert_eq!(event_category(Some("mail")), "mail");
    }

    #[test]
    fn test_empty_category_is_kept() {
        assert_eq!(event_category(Some("")), "");
    }

    #[test]
    fn test_view_path_defaults_to_root() {
        assert_eq!(view_path(None), "/");
        assert_eq!(view_path(Some("/inbox")), "/inbox");
    }

    #[test]
    fn test_action_prefers_verb() {
        assert_eq!(action_name(Some("open"), Some("Inbox")), "open");
        assert_eq!(action_name(None, Some("Inbox")), "Inbox");
        assert_eq!(action_name(None, None), "Unknown");
    }
}
