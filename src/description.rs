// SPDX-License-Identifier: MIT

//! Named-section editing for activity descriptions.
//!
//! Enrichers own named sections inside the description (e.g.
//! "🏃 Pace Summary"). A section starts at its header line and runs to
//! the next section boundary: a blank line followed by a line whose
//! first character is a symbol or emoji rather than a letter or digit.
//! Plain prose after a blank line still belongs to the current section,
//! which lets users write multi-paragraph notes without breaking a
//! section apart.

/// Byte range `[start, end)` of the section with the given header,
/// including the header line itself.
pub fn find_section(description: &str, header: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for line in description.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == header {
            let start = offset;
            let end = section_end(description, start + line.len());
            return Some((start, end));
        }
        offset += line.len();
    }
    None
}

/// Scan from `from` to the section boundary: a blank line whose next
/// non-empty line starts with a non-alphanumeric character.
fn section_end(description: &str, from: usize) -> usize {
    let rest = &description[from..];
    let mut offset = from;
    let mut lines = rest.split_inclusive('\n').peekable();
    while let Some(line) = lines.next() {
        let is_blank = line.trim_end_matches(['\r', '\n']).trim().is_empty();
        if is_blank {
            if let Some(next) = lines.peek() {
                let next_trimmed = next.trim_end_matches(['\r', '\n']);
                if let Some(first) = next_trimmed.chars().next() {
                    if !first.is_alphanumeric() {
                        return offset;
                    }
                }
            }
        }
        offset += line.len();
    }
    description.len()
}

/// True if the description contains a section with this header.
pub fn has_section(description: &str, header: &str) -> bool {
    find_section(description, header).is_some()
}

/// Section content without the header line, trimmed of surrounding
/// whitespace. `None` when the section is absent.
pub fn extract_section(description: &str, header: &str) -> Option<String> {
    let (start, end) = find_section(description, header)?;
    let section = &description[start..end];
    let body = section
        .split_once('\n')
        .map(|(_, rest)| rest)
        .unwrap_or("");
    Some(body.trim().to_string())
}

/// Replace (or append) the section with the given header.
///
/// Replacing with identical content is a no-op, so re-running an
/// enricher never grows the description. Empty content removes the
/// section entirely.
pub fn replace_section(description: &str, header: &str, content: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        return remove_section(description, header);
    }

    let section_text = format!("{header}\n{content}");
    match find_section(description, header) {
        Some((start, end)) => {
            let before = description[..start].trim_end();
            let after = description[end..].trim_start();
            join_parts(&[before, &section_text, after])
        }
        None => {
            let before = description.trim_end();
            join_parts(&[before, &section_text])
        }
    }
}

/// Remove the section with the given header, collapsing the blank lines
/// around it. Absent sections leave the description untouched.
pub fn remove_section(description: &str, header: &str) -> String {
    match find_section(description, header) {
        Some((start, end)) => {
            let before = description[..start].trim_end();
            let after = description[end..].trim_start();
            join_parts(&[before, after])
        }
        None => description.to_string(),
    }
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "🏃 Pace Summary";

    #[test]
    fn append_when_absent() {
        let out = replace_section("Great run today.", HEADER, "5:30 /km avg");
        assert_eq!(out, "Great run today.\n\n🏃 Pace Summary\n5:30 /km avg");
    }

    #[test]
    fn append_to_empty_description() {
        let out = replace_section("", HEADER, "5:30 /km avg");
        assert_eq!(out, "🏃 Pace Summary\n5:30 /km avg");
    }

    #[test]
    fn replace_is_idempotent() {
        let once = replace_section("Great run today.", HEADER, "5:30 /km avg");
        let twice = replace_section(&once, HEADER, "5:30 /km avg");
        assert_eq!(once, twice);
    }

    #[test]
    fn successive_replaces_match_a_single_replace() {
        let desc = "Intro.\n\n🏃 Pace Summary\n6:00 /km avg\n\n❤️ HR Zones\nZ2: 80%";
        let stepwise = replace_section(
            &replace_section(desc, HEADER, "5:30 /km avg"),
            HEADER,
            "5:10 /km avg",
        );
        assert_eq!(stepwise, replace_section(desc, HEADER, "5:10 /km avg"));
    }

    #[test]
    fn remove_after_replace_matches_plain_removal() {
        let desc = "Intro.\n\n🏃 Pace Summary\n6:00 /km avg\n\n❤️ HR Zones\nZ2: 80%";
        let replaced = replace_section(desc, HEADER, "5:30 /km avg");
        assert_eq!(
            remove_section(&replaced, HEADER),
            remove_section(desc, HEADER)
        );
    }

    #[test]
    fn replace_updates_in_place() {
        let desc = "Great run today.\n\n🏃 Pace Summary\n5:30 /km avg\n\n❤️ HR Zones\nZ2: 80%";
        let out = replace_section(desc, HEADER, "5:10 /km avg");
        assert_eq!(
            out,
            "Great run today.\n\n🏃 Pace Summary\n5:10 /km avg\n\n❤️ HR Zones\nZ2: 80%"
        );
    }

    #[test]
    fn prose_after_blank_line_stays_in_section() {
        let desc = "🏃 Pace Summary\n5:30 /km avg\n\nNegative splits throughout.";
        let extracted = extract_section(desc, HEADER).unwrap();
        assert_eq!(extracted, "5:30 /km avg\n\nNegative splits throughout.");
    }

    #[test]
    fn emoji_line_after_blank_line_ends_section() {
        let desc = "🏃 Pace Summary\n5:30 /km avg\n\n❤️ HR Zones\nZ2: 80%";
        let extracted = extract_section(desc, HEADER).unwrap();
        assert_eq!(extracted, "5:30 /km avg");
        assert!(has_section(desc, "❤️ HR Zones"));
    }

    #[test]
    fn empty_content_removes_section() {
        let desc = "Great run today.\n\n🏃 Pace Summary\n5:30 /km avg";
        let out = replace_section(desc, HEADER, "");
        assert_eq!(out, "Great run today.");
        assert!(!has_section(&out, HEADER));
    }

    #[test]
    fn remove_middle_section_collapses_blank_lines() {
        let desc = "Intro.\n\n🏃 Pace Summary\n5:30 /km avg\n\n❤️ HR Zones\nZ2: 80%";
        let out = remove_section(desc, HEADER);
        assert_eq!(out, "Intro.\n\n❤️ HR Zones\nZ2: 80%");
    }

    #[test]
    fn remove_absent_section_is_noop() {
        let desc = "Just a note.";
        assert_eq!(remove_section(desc, HEADER), desc);
    }

    #[test]
    fn extract_absent_section_is_none() {
        assert!(extract_section("Just a note.", HEADER).is_none());
    }

    #[test]
    fn header_must_match_whole_line() {
        let desc = "🏃 Pace Summary extended\ncontent";
        assert!(!has_section(desc, HEADER));
    }
}
