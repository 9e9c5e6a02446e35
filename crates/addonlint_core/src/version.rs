//! Firefox version strings.
//!
//! Manifest versions are compared with the toolkit rules: dot-separated parts,
//! each part `<number><string><number><string>`, where a missing string sorts
//! after any present one (`1.0` > `1.0b2`) and `*` is larger than any number.

use std::cmp::Ordering;

const MAX_VERSION_PARTS: usize = 4;
const MAX_PART_DIGITS: usize = 9;

#[derive(Debug, PartialEq, Eq)]
struct Part<'a> {
    major: u64,
    pre: &'a str,
    minor: u64,
    extra: &'a str,
}

fn split_number(s: &str) -> (u64, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let number = s[..end].parse().unwrap_or(0);
    (number, &s[end..])
}

fn split_text(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    (&s[..end], &s[end..])
}

fn parse_part(part: &str) -> Part<'_> {
    if part == "*" {
        return Part {
            major: u64::MAX,
            pre: "",
            minor: 0,
            extra: "",
        };
    }
    let (major, rest) = split_number(part);
    let (pre, rest) = split_text(rest);
    let (minor, extra) = split_number(rest);
    Part {
        major,
        pre,
        minor,
        extra,
    }
}

/// Compares two strings where the empty string sorts last.
fn compare_text(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

fn compare_parts(a: &Part<'_>, b: &Part<'_>) -> Ordering {
    a.major
        .cmp(&b.major)
        .then_with(|| compare_text(a.pre, b.pre))
        .then_with(|| a.minor.cmp(&b.minor))
        .then_with(|| compare_text(a.extra, b.extra))
}

/// Compares two toolkit version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.trim().split('.');
    let mut right = b.trim().split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (l, r) => {
                let ordering = compare_parts(&parse_part(l.unwrap_or("0")), &parse_part(r.unwrap_or("0")));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// The leading integer of a version string (`"57.0a1"` → 57).
pub fn major_version(version: &str) -> Option<u64> {
    let version = version.trim();
    let end = version
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(version.len());
    version[..end].parse().ok()
}

/// Whether a version string is 1 to 4 dot-separated integers without leading zeros.
pub fn is_valid_version_string(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() <= MAX_VERSION_PARTS
        && parts.iter().all(|part| {
            !part.is_empty()
                && part.len() <= MAX_PART_DIGITS
                && part.chars().all(|c| c.is_ascii_digit())
                && (*part == "0" || !part.starts_with('0'))
        })
}

/// Whether a version string follows the legacy toolkit format (`1.0a1`, `2.1pre`).
pub fn is_toolkit_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() <= MAX_VERSION_PARTS
        && parts.iter().all(|part| {
            part.starts_with(|c: char| c.is_ascii_digit())
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("78.0", "60.0", Ordering::Greater)]
    #[case("60", "78.0", Ordering::Less)]
    #[case("10.0", "9.0", Ordering::Greater)]
    #[case("78", "78.0.0", Ordering::Equal)]
    #[case("57.0a1", "57.0", Ordering::Less)]
    #[case("57.0b2", "57.0a1", Ordering::Greater)]
    #[case("1.0pre1", "1.0pre2", Ordering::Less)]
    #[case("1.*", "1.999", Ordering::Greater)]
    #[case("91.1.0", "91.0", Ordering::Greater)]
    fn test_compare_versions(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(compare_versions(a, b), expected);
    }

    #[rstest]
    #[case("57.0a1", Some(57))]
    #[case("48", Some(48))]
    #[case(" 102.3 ", Some(102))]
    #[case("preview", None)]
    #[case("≤57", None)]
    fn test_major_version(#[case] version: &str, #[case] expected: Option<u64>) {
        assert_eq!(major_version(version), expected);
    }

    #[rstest]
    #[case("1", true)]
    #[case("1.0.0.0", true)]
    #[case("0.10", true)]
    #[case("1.0.0.0.0", false)]
    #[case("01.0", false)]
    #[case("1.0a1", false)]
    #[case("1..0", false)]
    #[case("", false)]
    #[case("1234567890", false)]
    fn test_is_valid_version_string(#[case] version: &str, #[case] expected: bool) {
        assert_eq!(is_valid_version_string(version), expected);
    }

    #[rstest]
    #[case("1.0a1", true)]
    #[case("2.1pre", true)]
    #[case("1.0+", true)]
    #[case("a.1", false)]
    #[case("1.0 beta", false)]
    fn test_is_toolkit_version(#[case] version: &str, #[case] expected: bool) {
        assert_eq!(is_toolkit_version(version), expected);
    }
}
