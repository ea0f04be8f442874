//! Input shape checks shared by every crate that accepts user data.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Loose `local@domain.tld` shape check. Callers normalise (trim, lowercase) first.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}
