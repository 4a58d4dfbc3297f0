use std::collections::HashSet;

use addr::parse_domain_name;
use regex::RegexSet;
use url::Url;

/// Built-in deny-regex set unioned with any user-supplied deny-regex
/// (spec.md §4.4), seeded from the original crawler's media/style/script
/// extension exclusions.
const BUILTIN_DENY_PATTERNS: &[&str] = &[
    r"\.jpg", r"\.jpeg", r"\.png", r"\.mp4", r"\.webp", r"\.gif", r"\.css", r"\.js",
];

pub struct ScopeFilter {
    allow_set: HashSet<String>,
    allow_regex: RegexSet,
    deny_regex: RegexSet,
    deny_extensions: Vec<String>,
}

impl ScopeFilter {
    /// Builds a filter from the seed URLs (per `allow_starting_url_hostname`/
    /// `allow_starting_url_tld`), any explicitly allowed domains, and the
    /// user's allow/deny regex and deny-extension lists.
    pub fn new(
        starting_urls: &[String],
        allowed_domains: &[String],
        allow_starting_url_hostname: bool,
        allow_starting_url_tld: bool,
        allowed_regex: &[String],
        denied_regex: &[String],
        denied_extensions: &[String],
    ) -> Self {
        let mut allow_set: HashSet<String> = allowed_domains.iter().cloned().collect();

        for seed in starting_urls {
            if let Some((hostname, registrable)) = parse_tld(seed) {
                if allow_starting_url_hostname {
                    allow_set.insert(hostname);
                }
                if allow_starting_url_tld {
                    allow_set.insert(registrable);
                }
            }
        }

        let allow_patterns: Vec<&str> = allowed_regex.iter().map(|s| s.as_str()).collect();
        let allow_regex = RegexSet::new(allow_patterns.iter().map(|p| format!("(?i){p}")))
            .unwrap_or_else(|_| RegexSet::empty());

        let mut deny_patterns: Vec<String> =
            denied_regex.iter().map(|p| format!("(?i){p}")).collect();
        deny_patterns.extend(BUILTIN_DENY_PATTERNS.iter().map(|p| format!("(?i){p}")));
        let deny_regex = RegexSet::new(&deny_patterns).unwrap_or_else(|_| RegexSet::empty());

        ScopeFilter {
            allow_set,
            allow_regex,
            deny_regex,
            deny_extensions: denied_extensions.to_vec(),
        }
    }

    /// `valid_link` — scope-filter decision for a candidate link
    /// (spec.md §4.4).
    pub fn is_in_scope(&self, link: &str) -> bool {
        let Some((hostname, registrable)) = parse_tld(link) else {
            return false;
        };
        if !self.allow_set.contains(&hostname) && !self.allow_set.contains(&registrable) {
            return false;
        }
        if link.contains('@') {
            return false;
        }
        if self.allow_regex.is_match(link) {
            return true;
        }
        if self.deny_regex.is_match(link) {
            return false;
        }
        if self.deny_extensions.iter().any(|ext| link.ends_with(ext)) {
            return false;
        }
        true
    }
}

/// Returns `(hostname, registrable_domain)`, mirroring the original's
/// `parse_tld` (`tldextract`-derived subdomain+tld / eTLD+1 pair).
fn parse_tld(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_string();
    let name = parse_domain_name(&host).ok()?;
    let registrable = name.root()?.to_string();
    Some((host, registrable))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_filter() -> ScopeFilter {
        ScopeFilter::new(
            &["https://www.example.com".to_string()],
            &[],
            true,
            true,
            &[],
            &[],
            &[],
        )
    }

    #[test]
    fn accepts_same_hostname() {
        let f = seeded_filter();
        assert!(f.is_in_scope("https://www.example.com/index.html"));
    }

    #[test]
    fn accepts_sibling_subdomain_via_etld1() {
        let f = seeded_filter();
        assert!(f.is_in_scope("https://foo.example.com/index.html"));
    }

    #[test]
    fn rejects_other_domain() {
        let f = seeded_filter();
        assert!(!f.is_in_scope("https://google.com/index.html"));
    }

    #[test]
    fn hostname_only_allow_rejects_bare_registrable_domain() {
        let f = ScopeFilter::new(
            &["https://www.example.com".to_string()],
            &[],
            true,
            false,
            &[],
            &[],
            &[],
        );
        assert!(!f.is_in_scope("https://example.com/index.html"));
    }

    #[test]
    fn allow_regex_short_circuits_before_deny_checks() {
        let f = ScopeFilter::new(
            &["https://www.example.com".to_string()],
            &[],
            true,
            true,
            &[r"\.html$".to_string()],
            &[r"\.css$".to_string()],
            &[],
        );
        assert!(f.is_in_scope("https://www.example.com/index.html"));
        assert!(!f.is_in_scope("https://www.example.com/index.css"));
        // allow-regex isn't anchored and no deny rule matches this one.
        assert!(f.is_in_scope("https://www.example.com/index.htmlsss"));
    }
}
