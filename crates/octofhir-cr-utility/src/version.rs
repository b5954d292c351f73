//! Dotted version ordering

use std::cmp::Ordering;

/// Compare two dotted version strings.
///
/// Segments are compared numerically after padding the shorter version with
/// zeros (`1.0` equals `1.0.0`). An absent version sorts after every present
/// one, so an unversioned candidate is always treated as the latest.
/// Segments that are not integers compare lexically and sort after numeric
/// segments.
pub fn compare_versions(v1: Option<&str>, v2: Option<&str>) -> Ordering {
    match (v1, v2) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_dotted(a.trim(), b.trim()),
    }
}

fn compare_dotted(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('.').collect();
    let right: Vec<&str> = b.split('.').collect();

    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).copied().unwrap_or("0");
        let r = right.get(i).copied().unwrap_or("0");
        match compare_segment(l, r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// The latest of a set of versions under [`compare_versions`]. The first of
/// several equal maxima wins.
pub fn max_version<'a>(versions: impl IntoIterator<Item = Option<&'a str>>) -> Option<Option<&'a str>> {
    let mut best: Option<Option<&'a str>> = None;
    for version in versions {
        best = match best {
            Some(current) if compare_versions(version, current) != Ordering::Greater => Some(current),
            _ => Some(version),
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0.0", "1.0.0", Ordering::Equal)]
    #[case("1.0", "1.0.0", Ordering::Equal)]
    #[case("1.10.0", "1.9.0", Ordering::Greater)]
    #[case("2.0.0", "10.0.0", Ordering::Less)]
    #[case("4.0.1", "4.0.001", Ordering::Equal)]
    #[case("1.0.0-draft", "1.0.0", Ordering::Greater)]
    #[case("1.0.a", "1.0.b", Ordering::Less)]
    fn test_compare_present_versions(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(compare_versions(Some(a), Some(b)), expected);
    }

    #[test]
    fn test_absent_version_is_latest() {
        assert_eq!(compare_versions(None, Some("1.0")), Ordering::Greater);
        assert_eq!(compare_versions(Some("1.0"), None), Ordering::Less);
        assert_eq!(compare_versions(None, None), Ordering::Equal);
    }

    #[test]
    fn test_max_version() {
        assert_eq!(max_version([Some("1.0.0"), Some("2.0.0"), Some("1.5")]), Some(Some("2.0.0")));
        assert_eq!(max_version([Some("1.0.0"), None]), Some(None));
        assert_eq!(max_version(Vec::<Option<&str>>::new()), None);
    }
}
