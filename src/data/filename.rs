use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ParsedName – decoded form of a file stem
// ---------------------------------------------------------------------------

/// Key/value tokens and the optional modality suffix recovered from a stem
/// such as `sub-01_ses-01_task-free_mod-adhawk_pupils`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedName {
    /// `key → value` for every `key-value` segment. Last key wins.
    pub pairs: BTreeMap<String, String>,
    /// Everything after `mod-<value>_`, verbatim.
    pub suffix: Option<String>,
}

impl ParsedName {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    /// No recognisable `key-value` token was found.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Re-encode the pairs as `key-value` segments joined by underscores,
    /// in key order.
    pub fn encode_pairs(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k}-{v}"))
            .collect::<Vec<_>>()
            .join("_")
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Parse the stem of `path` (extension ignored).
pub fn parse_path(path: &Path) -> ParsedName {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    parse_stem(&stem)
}

/// Decode a file stem.
///
/// The stem is split on `_`. A segment is a pair when it has a non-empty
/// alphanumeric key before its first `-` and a non-empty value after it; the
/// value may itself contain dashes. Other segments are ignored for the
/// mapping but still count towards the suffix.
pub fn parse_stem(stem: &str) -> ParsedName {
    let segments: Vec<&str> = stem.split('_').collect();

    let mut pairs = BTreeMap::new();
    // Segment index that produced the current `mod` value.
    let mut mod_segment = None;

    for (idx, segment) in segments.iter().enumerate() {
        let Some((key, value)) = split_pair(segment) else {
            continue;
        };
        if key == "mod" {
            mod_segment = Some(idx);
        }
        pairs.insert(key.to_string(), value.to_string());
    }

    let suffix = mod_segment
        .map(|idx| segments[idx + 1..].join("_"))
        .filter(|rest| !rest.is_empty());

    ParsedName { pairs, suffix }
}

fn split_pair(segment: &str) -> Option<(&str, &str)> {
    let (key, value) = segment.split_once('-')?;
    if key.is_empty() || value.is_empty() {
        return None;
    }
    if !key.chars().all(char::is_alphanumeric) {
        return None;
    }
    Some((key, value))
}
