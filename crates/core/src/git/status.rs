//! Parsers for `git status --porcelain` and `git diff --numstat` output.

use tracing::{debug, trace};

use crate::conflict::{classify, ConflictedFile};

/// One line of porcelain v1 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Two-character XY code, e.g. `UU` or ` M`.
    pub code: String,
    /// Path relative to the repository root, unquoted.
    pub path: String,
}

/// Split porcelain v1 output into entries. Lines too short to carry a code
/// and a path are skipped.
pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    output
        .lines()
        .filter_map(|line| {
            if line.len() < 4 || !line.is_char_boundary(2) || !line.is_char_boundary(3) {
                return None;
            }
            let code = &line[..2];
            let raw_path = &line[3..];
            // Renames and copies are reported as "old -> new"; keep the new path.
            let raw_path = match code.chars().next() {
                Some('R') | Some('C') => raw_path.rsplit(" -> ").next().unwrap_or(raw_path),
                _ => raw_path,
            };
            Some(StatusEntry {
                code: code.to_string(),
                path: unquote_path(raw_path),
            })
        })
        .collect()
}

/// Keep only the entries whose code classifies as a conflict, preserving
/// the order git reported them in.
pub fn conflicted_files(output: &str) -> Vec<ConflictedFile> {
    let files: Vec<ConflictedFile> = parse_porcelain(output)
        .into_iter()
        .filter_map(|entry| match classify(&entry.code) {
            Ok(kind) => Some(ConflictedFile::new(entry.path, kind)),
            Err(e) => {
                trace!(path = %entry.path, error = %e, "not a conflict");
                None
            }
        })
        .collect();
    debug!(count = files.len(), "parsed conflicted files from porcelain status");
    files
}

/// Undo git's C-style path quoting (`core.quotePath`).
///
/// Unquoted input is returned unchanged. Octal escapes are decoded as raw
/// bytes so multi-byte UTF-8 names round-trip.
pub fn unquote_path(raw: &str) -> String {
    let inner = match raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        Some(inner) => inner,
        None => return raw.to_string(),
    };

    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next = bytes[i + 1];
        match next {
            b'0'..=b'7' => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take(3)
                    .take_while(|b| (b'0'..=b'7').contains(b))
                    .count();
                let value = bytes[i + 1..i + 1 + digits]
                    .iter()
                    .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                out.push((value & 0xff) as u8);
                i += 1 + digits;
            }
            _ => {
                out.push(match next {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'r' => b'\r',
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    b'v' => 0x0b,
                    other => other,
                });
                i += 2;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Whether `git diff --numstat` reports any entry as binary (`-\t-\t`).
pub fn numstat_reports_binary(output: &str) -> bool {
    output.lines().any(|line| line.starts_with("-\t-\t"))
}

/// Whether `git check-attr binary` reports the attribute as set.
pub fn check_attr_reports_binary(output: &str) -> bool {
    output
        .lines()
        .any(|line| line.trim_end().ends_with("binary: set"))
}
