//! Hostname to fully-qualified name normalization

/// Combine a configured hostname with the zone's base domain.
///
/// The label is lowercased and trimmed first, so the suffix check is not
/// fooled by case. `@` and the base domain itself address the apex; a name
/// already under the base domain is used as is; anything else gets the base
/// domain appended, whether it has one label or several.
pub fn fully_qualified_name(label: &str, base_domain: &str) -> String {
    let name = label.trim().trim_end_matches('.').to_lowercase();
    let base = base_domain.trim().trim_end_matches('.').to_lowercase();

    if name == "@" || name == base {
        return base;
    }

    if name.ends_with(&format!(".{}", base)) {
        return name;
    }

    format!("{}.{}", name, base)
}
