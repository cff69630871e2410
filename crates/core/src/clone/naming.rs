//! `[Clone N]` display names for cloned events.
//!
//! A clone of `"Summit"` is named `"Summit [Clone 1]"`; cloning either of
//! them again yields `"Summit [Clone 2]"` rather than nesting markers.
//! Only well-formed markers (`[Clone ` + digits + `]`) are recognised.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Matches a single well-formed clone marker and captures its number.
static CLONE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Clone (\d+)\]").expect("valid regex"));

/// Maximum allowed length for an event name.
pub const MAX_EVENT_NAME_LENGTH: usize = 255;

/// Return one more than the highest clone number found across `names`,
/// or `1` when no name carries a marker.
///
/// Fails when the highest number is already `u32::MAX`.
///
/// # Examples
///
/// ```
/// use muster_core::clone::naming::find_max_clone_number;
///
/// let names = ["Event A", "Event A [Clone 1]", "Event A [Clone 3]"];
/// assert_eq!(find_max_clone_number(names).unwrap(), 4);
/// ```
pub fn find_max_clone_number<I, S>(names: I) -> Result<u32, CoreError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let max = names
        .into_iter()
        .flat_map(|name| {
            CLONE_MARKER_RE
                .captures_iter(name.as_ref())
                .filter_map(|caps| caps[1].parse::<u32>().ok())
                .collect::<Vec<_>>()
        })
        .max();

    match max {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            CoreError::Validation(format!("No clone number is left after [Clone {max}]"))
        }),
    }
}

/// Strip every well-formed clone marker to recover the base event name.
///
/// Each removed marker takes one adjacent space with it (the one before it
/// when present, otherwise the one after). All other characters, including
/// runs of whitespace, are kept. Malformed markers such as `[Clone]` or
/// `[clone 2]` are kept verbatim.
pub fn extract_event_name(name: &str) -> String {
    let mut base = String::with_capacity(name.len());
    let mut cursor = 0;

    for marker in CLONE_MARKER_RE.find_iter(name) {
        let mut start = marker.start();
        let mut end = marker.end();
        if start > cursor && name[..start].ends_with(' ') {
            start -= 1;
        } else if name[end..].starts_with(' ') {
            end += 1;
        }
        base.push_str(&name[cursor..start]);
        cursor = end;
    }

    base.push_str(&name[cursor..]);
    base
}

/// Render the display name for clone number `number` of `base`.
pub fn clone_event_name(base: &str, number: u32) -> String {
    format!("{base} [Clone {number}]")
}

/// Derive the next non-colliding clone name for `source_name`.
///
/// Only siblings sharing the same base name contribute to the numbering,
/// so `"Summit B [Clone 7]"` does not influence clones of `"Summit"`.
pub fn next_clone_name<I, S>(source_name: &str, siblings: I) -> Result<String, CoreError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let base = extract_event_name(source_name);
    let related: Vec<String> = siblings
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .chain(std::iter::once(source_name.to_string()))
        .filter(|s| extract_event_name(s) == base)
        .collect();

    Ok(clone_event_name(&base, find_max_clone_number(&related)?))
}

/// Validate a caller-supplied event name.
pub fn validate_event_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Event name must not be empty".to_string(),
        ));
    }
    if trimmed.len() != name.len() {
        return Err(CoreError::Validation(
            "Event name must not have leading or trailing whitespace".to_string(),
        ));
    }
    if name.len() > MAX_EVENT_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Event name must not exceed {MAX_EVENT_NAME_LENGTH} characters, got {}",
            name.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- find_max_clone_number --

    #[test]
    fn max_clone_number_is_next_after_highest() {
        let names = ["Event A", "Event A [Clone 1]", "Event A [Clone 3]"];
        assert_eq!(find_max_clone_number(names).unwrap(), 4);
    }

    #[test]
    fn no_markers_starts_at_one() {
        assert_eq!(find_max_clone_number(["Event A", "Event B"]).unwrap(), 1);
        assert_eq!(find_max_clone_number(Vec::<String>::new()).unwrap(), 1);
    }

    #[test]
    fn malformed_markers_are_ignored() {
        let names = ["Event [Clone]", "Event [clone 9]", "Event [Clone x]", "Event [Clone 2]"];
        assert_eq!(find_max_clone_number(names).unwrap(), 3);
    }

    #[test]
    fn markers_anywhere_in_the_name_count() {
        assert_eq!(find_max_clone_number(["[Clone 5] Event"]).unwrap(), 6);
    }

    #[test]
    fn exhausted_clone_numbers_are_rejected() {
        let names = ["Event", "Event [Clone 4294967295]"];
        assert!(matches!(
            find_max_clone_number(names),
            Err(CoreError::Validation(_))
        ));
        assert!(next_clone_name("Event", ["Event [Clone 4294967295]"]).is_err());
    }

    // -- extract_event_name --

    #[test]
    fn extract_strips_suffix_marker() {
        assert_eq!(extract_event_name("Event A [Clone 3]"), "Event A");
    }

    #[test]
    fn extract_strips_prefix_and_nested_markers() {
        assert_eq!(extract_event_name("[Clone 1][Clone 2] Event"), "Event");
        assert_eq!(extract_event_name("[Clone 1] Event [Clone 2]"), "Event");
    }

    #[test]
    fn extract_leaves_malformed_names_unchanged() {
        assert_eq!(extract_event_name("Event [Clone]"), "Event [Clone]");
        assert_eq!(extract_event_name("Plain Event"), "Plain Event");
        assert_eq!(extract_event_name("Plain\tEvent"), "Plain\tEvent");
        assert_eq!(extract_event_name(" Padded  "), " Padded  ");
    }

    #[test]
    fn extract_keeps_inner_spacing_around_a_middle_marker() {
        assert_eq!(extract_event_name("Summit [Clone 2] 2024"), "Summit 2024");
        assert_eq!(extract_event_name("[Clone 1] [Clone 2] Summit"), "Summit");
    }

    #[test]
    fn extract_round_trips_generated_names() {
        for base in ["Event A", "Summit 2024", "x", "Summit  2024", "Plain\tEvent", "Trailing "] {
            let siblings = [base.to_string(), clone_event_name(base, 4)];
            let name = clone_event_name(base, find_max_clone_number(&siblings).unwrap());
            assert_eq!(extract_event_name(&name), base);
        }
    }

    // -- next_clone_name --

    #[test]
    fn next_name_for_first_clone() {
        assert_eq!(
            next_clone_name("Summit", Vec::<String>::new()).unwrap(),
            "Summit [Clone 1]"
        );
    }

    #[test]
    fn next_name_does_not_nest_markers() {
        let siblings = ["Summit", "Summit [Clone 1]", "Summit [Clone 2]"];
        assert_eq!(
            next_clone_name("Summit [Clone 1]", siblings).unwrap(),
            "Summit [Clone 3]"
        );
    }

    #[test]
    fn next_name_ignores_other_bases() {
        let siblings = ["Summit B [Clone 7]", "Summit [Clone 1]"];
        assert_eq!(next_clone_name("Summit", siblings).unwrap(), "Summit [Clone 2]");
    }

    #[test]
    fn next_name_counts_prefix_markers() {
        let siblings = ["[Clone 4] Summit", "Summit  [Clone 9]"];
        assert_eq!(next_clone_name("Summit", siblings).unwrap(), "Summit [Clone 5]");
    }

    // -- validate_event_name --

    #[test]
    fn validate_rejects_empty_and_padded_names() {
        assert!(validate_event_name("").is_err());
        assert!(validate_event_name("   ").is_err());
        assert!(validate_event_name(" Summit").is_err());
        assert!(validate_event_name("Summit").is_ok());
    }

    #[test]
    fn validate_rejects_overlong_names() {
        let long = "a".repeat(MAX_EVENT_NAME_LENGTH + 1);
        assert!(validate_event_name(&long).is_err());
    }
}
