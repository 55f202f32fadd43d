//! Built-in rule tables. Everything here can be replaced through the `rules` section of the
//! configuration file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const BROWSER_CATEGORY: &str = "Browser";
pub const OTHER_CATEGORY: &str = "Other";

/// Application rule. Matches when the lowercased process name contains any of `process` or the
/// lowercased window title contains any of `title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRule {
    pub category: String,
    #[serde(default)]
    pub process: Vec<String>,
    #[serde(default)]
    pub title: Vec<String>,
}

/// Website rule. Matches when the lowercased website label contains any of `patterns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteRule {
    pub category: String,
    pub patterns: Vec<String>,
}

/// Complete set of categorization rules. Rule order is priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Process name fragments identifying web browsers.
    pub browsers: Vec<String>,
    /// Title suffixes browsers append after the page title.
    pub browser_suffixes: Vec<String>,
    /// Separators tried in order when a title carries no known browser suffix.
    pub title_separators: Vec<String>,
    /// Evaluated after the implicit browser rule.
    pub app_rules: Vec<AppRule>,
    pub website_rules: Vec<WebsiteRule>,
    /// Lowercased process name to the name shown to the user.
    pub display_names: BTreeMap<String, String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn app_rule(category: &str, process: &[&str], title: &[&str]) -> AppRule {
    AppRule {
        category: category.into(),
        process: strings(process),
        title: strings(title),
    }
}

fn website_rule(category: &str, patterns: &[&str]) -> WebsiteRule {
    WebsiteRule {
        category: category.into(),
        patterns: strings(patterns),
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            browsers: strings(&["chrome", "firefox", "msedge", "opera", "safari", "browser"]),
            browser_suffixes: strings(&[
                " - Google Chrome",
                " - Microsoft Edge",
                " - Mozilla Firefox",
                " — Mozilla Firefox",
                " - Opera",
            ]),
            title_separators: strings(&[" - ", " | ", " — ", " • "]),
            app_rules: vec![
                app_rule("Development", &["devenv", "code"], &["visual studio"]),
                app_rule(
                    "Office",
                    &["word", "excel", "powerpoint"],
                    &["word", "excel"],
                ),
                app_rule("Text", &["notepad", "wordpad"], &[]),
                app_rule("System", &["explorer"], &[]),
                app_rule("Messenger", &["telegram", "discord", "whatsapp", "slack"], &[]),
                app_rule("Media", &["spotify", "music", "youtube.com"], &[]),
                app_rule("Games", &["game", "steam"], &[]),
                app_rule("Mail", &["outlook"], &["mail", "gmail"]),
            ],
            website_rules: vec![
                website_rule("Video", &["youtube", "twitch", "netflix"]),
                website_rule("Development", &["github", "stackoverflow", "gitlab"]),
                website_rule("Social", &["facebook", "instagram", "vk", "twitter"]),
                website_rule("Mail", &["mail", "gmail", "outlook"]),
                website_rule("Search", &["google", "yandex", "bing"]),
                website_rule("Shopping", &["amazon", "aliexpress", "wildberries"]),
                website_rule("Blogs/Forums", &["reddit", "habr", "medium"]),
            ],
            display_names: [
                ("chrome", "Google Chrome"),
                ("msedge", "Microsoft Edge"),
                ("firefox", "Mozilla Firefox"),
                ("opera", "Opera Browser"),
                ("notepad", "Notepad"),
                ("winword", "Microsoft Word"),
                ("excel", "Microsoft Excel"),
                ("powerpnt", "Microsoft PowerPoint"),
                ("devenv", "Visual Studio"),
                ("code", "VS Code"),
                ("explorer", "File Explorer"),
                ("telegram", "Telegram"),
                ("discord", "Discord"),
                ("whatsapp", "WhatsApp"),
                ("slack", "Slack"),
                ("outlook", "Outlook"),
                ("teams", "Microsoft Teams"),
            ]
            .into_iter()
            .map(|(process, name)| (process.to_string(), name.to_string()))
            .collect(),
        }
    }
}
