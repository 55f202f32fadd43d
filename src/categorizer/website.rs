use crate::window_api::UNKNOWN;

/// Longest label kept from a title that carries no separator.
pub const MAX_PLAIN_LABEL_CHARS: usize = 40;

/// Guesses which website a browser window shows from its title. Browsers don't expose the URL
/// through the window, so this is a heuristic:
///
/// 1. a known browser suffix (` - Google Chrome`) is stripped and the rest is the page label;
/// 2. otherwise the last segment after the first separator found is used (`Inbox | Mail` ->
///    `Mail`);
/// 3. otherwise the title itself, cut to [MAX_PLAIN_LABEL_CHARS] characters.
pub fn extract_website(title: &str, browser_suffixes: &[String], separators: &[String]) -> String {
    let title = title.trim();
    if title.is_empty() {
        return UNKNOWN.to_string();
    }

    for suffix in browser_suffixes {
        if let Some(page) = title.strip_suffix(suffix.as_str()) {
            let page = page.trim();
            if !page.is_empty() {
                return page.to_string();
            }
        }
    }

    for separator in separators {
        if !title.contains(separator.as_str()) {
            continue;
        }
        let label = title
            .split(separator.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .last();
        if let Some(label) = label {
            return label.to_string();
        }
    }

    title.chars().take(MAX_PLAIN_LABEL_CHARS).collect()
}
