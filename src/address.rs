//! Address clean-up applied before geocoding.

/// Longest address passed to a geocoder; longer input is usually a note.
const MAX_ADDRESS_CHARS: usize = 50;

/// Cleans a raw address for lookup.
///
/// Multi-line input is joined, slashes become dashes, the text is capped at
/// 50 characters, a leading unit number (`#4 - 123 Main St`, `12-345 Fort St`)
/// is dropped and the city is appended when it is not already mentioned.
/// Returns `None` when nothing usable remains.
///
/// ```
/// use route_planner::address::normalize_address;
///
/// assert_eq!(
///     normalize_address("#4 - 1010 Fort St", Some("Victoria")).as_deref(),
///     Some("1010 Fort St, Victoria")
/// );
/// assert_eq!(normalize_address("  \n ", None), None);
/// ```
pub fn normalize_address(raw: &str, city: Option<&str>) -> Option<String> {
    let joined = raw
        .trim()
        .replace("\r\n", "\n")
        .replace('\n', ", ")
        .replace('/', "-");
    let capped: String = joined.chars().take(MAX_ADDRESS_CHARS).collect();
    let address = strip_unit_number(&capped).trim();
    if address.is_empty() {
        return None;
    }

    match city.map(str::trim).filter(|city| !city.is_empty()) {
        Some(city) if !address.to_lowercase().contains(&city.to_lowercase()) => {
            Some(format!("{address}, {city}"))
        }
        _ => Some(address.to_string()),
    }
}

/// Drops a `#12 -` or `12-` style unit prefix, leaving other text untouched.
fn strip_unit_number(address: &str) -> &str {
    let rest = address.strip_prefix('#').unwrap_or(address);
    let after_digits = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    if after_digits.len() == rest.len() {
        return address;
    }
    let after_space = after_digits.trim_start();
    if !after_space.starts_with('-') {
        return address;
    }
    after_space.trim_start_matches('-').trim_start()
}
