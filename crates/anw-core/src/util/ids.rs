//! Identifier normalization.
//!
//! Emails are the identity key of the user directory and are compared
//! case-insensitively; permission keys are compared after trimming.

/// Normalize an email for identity comparison.
///
/// Trims surrounding whitespace and lower-cases.
///
/// # Examples
///
/// ```
/// use anw_core::util::ids::normalize_email;
///
/// assert_eq!(normalize_email("  Alice@Example.IE "), "alice@example.ie");
/// assert_eq!(normalize_email(""), "");
/// ```
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize a permission key (`page:home`, `feature:alerts:tab_contacts`).
///
/// Keys are case-sensitive; only surrounding whitespace is removed.
///
/// # Examples
///
/// ```
/// use anw_core::util::ids::normalize_key;
///
/// assert_eq!(normalize_key(" page:dashboard\n"), "page:dashboard");
/// ```
pub fn normalize_key(key: &str) -> String {
    key.trim().to_string()
}
