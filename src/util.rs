//! Shared utility helpers.

/// Case-insensitive equality for identifiers.
#[inline]
pub fn eq_ci(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.as_bytes().eq_ignore_ascii_case(b.as_bytes())
}

/// Case-insensitive starts_with check without allocating.
#[inline]
pub fn starts_with_ci(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.as_bytes()[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
}

/// Lowercased key used by identity caches and exclusion sets.
#[inline]
pub fn fold_key(name: &str) -> String {
    name.to_lowercase()
}

/// Split a qualified name (`Namespace.Name` or `Alias.Name`) into its
/// qualifier and simple name. Namespaces may themselves contain dots, so the
/// split happens on the last one.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Parse an EDMX boolean attribute value ("true"/"false", any case).
pub fn parse_bool(value: &str) -> Option<bool> {
    if eq_ci(value, "true") {
        Some(true)
    } else if eq_ci(value, "false") {
        Some(false)
    } else {
        None
    }
}
