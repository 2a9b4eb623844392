//! Field format checks shared by the record types.

pub fn is_email(s: &str) -> bool {
    let s = s.trim();
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else { return false };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}

pub fn is_http_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or("");
            host.contains('.') && !host.starts_with('.') && !host.ends_with('.') && !rest.contains(' ')
        }
        None => false,
    }
}

/// Lowercase, ASCII alphanumerics joined by single dashes.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut dash = false;
    for c in s.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// `Some(trimmed)` when the value carries text.
pub fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_formats() {
        assert!(is_email("jane@devworks.io"));
        assert!(!is_email("jane@devworks"));
        assert!(!is_email("jane devworks.io"));
        assert!(!is_email("@devworks.io"));
    }

    #[test]
    fn url_formats() {
        assert!(is_http_url("https://devworks.io/path"));
        assert!(is_http_url("http://www.example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("https://localhost"));
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("  Devworks Bootcamp! 2024 "), "devworks-bootcamp-2024");
        assert_eq!(slugify("UI/UX"), "ui-ux");
    }
}
