/// Prefix a local number with `country_code` unless it already carries an
/// international `+` prefix. Spaces and dashes are dropped.
pub fn normalize_phone(phone: &str, country_code: &str) -> String {
    let compact: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if compact.starts_with('+') || compact.is_empty() {
        compact
    } else {
        format!("{}{}", country_code, compact)
    }
}
