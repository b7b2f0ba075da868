//! Package list assembly for the installer's stdin.

use std::sync::LazyLock;

use regex::Regex;

/// Module name `ExtUtils::Installed` uses for perl itself.
pub const SENTINEL: &str = "Perl";

static VERSION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?\d+(\.\d+)*$").expect("valid version regex"));

/// Trim a raw line down to the module name it carries.
fn name_of(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}

pub fn is_sentinel(line: &[u8]) -> bool {
    name_of(line) == SENTINEL.as_bytes()
}

/// Parse the lister's first line as a perl version (`5.036000`, `v5.36.0`).
pub fn parse_version_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    VERSION_LINE
        .is_match(trimmed)
        .then(|| trimmed.to_string())
}

/// Sort core modules for deterministic output, dropping duplicates and perl itself.
pub fn sort_core_modules<I>(modules: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut sorted: Vec<String> = modules
        .into_iter()
        .filter(|name| !name.is_empty() && name != SENTINEL)
        .collect();
    sorted.sort();
    sorted.dedup();
    sorted
}

/// Prepare one raw lister line for relay.
///
/// Returns `None` for the sentinel; otherwise the line, newline-terminated.
pub fn relay_line(mut line: Vec<u8>) -> Option<Vec<u8>> {
    if is_sentinel(&line) {
        return None;
    }
    if line.last() != Some(&b'\n') {
        line.push(b'\n');
    }
    Some(line)
}
