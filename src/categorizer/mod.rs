//! Maps windows and websites to coarse categories. The [Categorizer] trait is what the tracker
//! depends on, [RuleCategorizer] is the table driven implementation configured by a [RuleSet].

pub mod rules;
pub mod website;

use rules::{AppRule, RuleSet, WebsiteRule, BROWSER_CATEGORY, OTHER_CATEGORY};

pub trait Categorizer: Send + Sync {
    fn is_browser(&self, process_name: &str) -> bool;

    fn categorize_app(&self, process_name: &str, window_title: &str) -> String;

    fn categorize_website(&self, website: &str) -> String;

    fn extract_website(&self, window_title: &str) -> String;

    /// Name shown to the user for a process, e.g. `Google Chrome` for `chrome`.
    fn display_name(&self, process_name: &str) -> String;
}

/// Ordered substring rules, first match wins. All patterns are compared case-insensitively.
pub struct RuleCategorizer {
    rules: RuleSet,
}

impl RuleCategorizer {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: lowercase_patterns(rules),
        }
    }

    fn app_rule_matches(rule: &AppRule, process: &str, title: &str) -> bool {
        rule.process.iter().any(|p| process.contains(p.as_str()))
            || rule.title.iter().any(|p| title.contains(p.as_str()))
    }

    fn website_rule_matches(rule: &WebsiteRule, website: &str) -> bool {
        rule.patterns.iter().any(|p| website.contains(p.as_str()))
    }
}

impl Default for RuleCategorizer {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}

fn lowercase_patterns(mut rules: RuleSet) -> RuleSet {
    let lower = |values: &mut Vec<String>| {
        values.iter_mut().for_each(|v| *v = v.to_lowercase());
        values.retain(|v| !v.is_empty());
    };
    lower(&mut rules.browsers);
    for rule in &mut rules.app_rules {
        lower(&mut rule.process);
        lower(&mut rule.title);
    }
    for rule in &mut rules.website_rules {
        lower(&mut rule.patterns);
    }
    rules.display_names = rules
        .display_names
        .into_iter()
        .map(|(process, name)| (process.to_lowercase(), name))
        .collect();
    rules
}

impl Categorizer for RuleCategorizer {
    fn is_browser(&self, process_name: &str) -> bool {
        let process = process_name.to_lowercase();
        self.rules
            .browsers
            .iter()
            .any(|browser| process.contains(browser.as_str()))
    }

    fn categorize_app(&self, process_name: &str, window_title: &str) -> String {
        if self.is_browser(process_name) {
            return BROWSER_CATEGORY.to_string();
        }
        let process = process_name.to_lowercase();
        let title = window_title.to_lowercase();
        self.rules
            .app_rules
            .iter()
            .find(|rule| Self::app_rule_matches(rule, &process, &title))
            .map_or_else(|| OTHER_CATEGORY.to_string(), |rule| rule.category.clone())
    }

    fn categorize_website(&self, website: &str) -> String {
        let website = website.to_lowercase();
        self.rules
            .website_rules
            .iter()
            .find(|rule| Self::website_rule_matches(rule, &website))
            .map_or_else(|| OTHER_CATEGORY.to_string(), |rule| rule.category.clone())
    }

    fn extract_website(&self, window_title: &str) -> String {
        website::extract_website(
            window_title,
            &self.rules.browser_suffixes,
            &self.rules.title_separators,
        )
    }

    fn display_name(&self, process_name: &str) -> String {
        self.rules
            .display_names
            .get(&process_name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| process_name.to_string())
    }
}
