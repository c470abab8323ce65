use regex::{Captures, Regex};

/// Shift a section's headings so its first heading is level 2.
///
/// Every heading of depth `d` becomes `max(2, d + 2 - d0)`, where `d0` is the
/// depth of the first heading. Blank sections and sections without headings
/// are returned unchanged.
pub fn normalize_headings(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return markdown.to_string();
    }

    let (Ok(first), Ok(heading)) = (
        Regex::new(r"(?m)^(#+)[ \t]"),
        Regex::new(r"(?m)^(#+)[ \t](.+)$"),
    ) else {
        return markdown.to_string();
    };

    let Some(first_depth) = first.captures(markdown).map(|caps| caps[1].len()) else {
        return markdown.to_string();
    };
    let shift = 2 - first_depth as isize;

    heading
        .replace_all(markdown, |caps: &Captures| {
            let depth = (caps[1].len() as isize + shift).max(2) as usize;
            format!("{} {}", "#".repeat(depth), &caps[2])
        })
        .into_owned()
}
