use super::types::{CompiledRule, ResourceType};
use url::Url;

/// Returns the highest-priority rule that applies to a request for `url`.
/// Ties go to the lowest rule ID.
pub fn first_match<'a>(
    rules: &'a [CompiledRule],
    url: &str,
    resource_type: ResourceType,
) -> Option<&'a CompiledRule> {
    // Url adds the root path ("https://a.com" -> "https://a.com/"). Filters
    // match case-insensitively, so path and query are folded too.
    let normalized = match Url::parse(url) {
        Ok(parsed) => parsed.as_str().to_lowercase(),
        Err(_) => url.to_lowercase(),
    };

    rules
        .iter()
        .filter(|rule| rule.condition.resource_types.contains(&resource_type))
        .filter(|rule| glob_match(rule.url_filter(), &normalized))
        .min_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)))
}

/// `*` matches any run of characters, including none. Everything else is literal.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some(pi);
            pi += 1;
            resume = ti;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            resume += 1;
            ti = resume;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}
