//! Translation of user-entered site strings into URL filter patterns.

/// Pattern that would match every URL on the web. Never installed.
pub const CATCH_ALL_PATTERN: &str = "*://*/*";

/// Compiles one block list entry into the URL patterns that block it.
///
/// Domains yield the bare host, its `www.` form and a subdomain wildcard.
/// Anything else is treated as a keyword that may appear anywhere in the host
/// or path. An entry that normalizes to nothing yields no patterns.
pub fn compile(site: &str) -> Vec<String> {
    let site = normalize(site);
    if site.is_empty() {
        return Vec::new();
    }

    if is_domain(&site) {
        let mut patterns = vec![format!("*://{}/*", site), format!("*://www.{}/*", site)];
        // A leading wildcard already covers subdomains.
        if !site.starts_with('*') {
            patterns.push(format!("*://*.{}/*", site));
        }
        patterns
    } else {
        vec![format!("*://*{}*/*", site)]
    }
}

/// Lower-cases the entry and strips the scheme, a leading `www.` and any
/// trailing slashes.
pub fn normalize(site: &str) -> String {
    let lowered = site.trim().to_lowercase();
    let mut rest = lowered.as_str();
    for scheme in ["https://", "http://"] {
        if let Some(stripped) = rest.strip_prefix(scheme) {
            rest = stripped;
            break;
        }
    }
    if let Some(stripped) = rest.strip_prefix("www.") {
        rest = stripped;
    }
    rest.trim_end_matches('/').trim().to_string()
}

/// A domain has a dot and ends in an alphabetic label of two or more letters.
pub fn is_domain(normalized: &str) -> bool {
    match normalized.rfind('.') {
        Some(idx) => {
            let suffix = &normalized[idx + 1..];
            suffix.len() >= 2 && suffix.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// True for any pattern that reduces to the catch-all once repeated
/// wildcards are collapsed (`*://***/*` is as broad as `*://*/*`).
pub fn is_catch_all(pattern: &str) -> bool {
    let mut collapsed = String::with_capacity(pattern.len());
    let mut prev_star = false;
    for c in pattern.chars() {
        if c == '*' {
            if prev_star {
                continue;
            }
            prev_star = true;
        } else {
            prev_star = false;
        }
        collapsed.push(c);
    }
    collapsed == CATCH_ALL_PATTERN || collapsed == "*" || collapsed == "*://*"
}
