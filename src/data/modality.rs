use super::filename::ParsedName;

/// Key used in `raw_signals` for a file without a `mod` tag.
pub const NO_MODALITY: &str = "none";

/// Device/vendor tag (`mod` value), if any.
pub fn device_tag(parsed: &ParsedName) -> Option<&str> {
    parsed.get("mod")
}

/// Canonical modality identifier: `<mod>_<suffix>` or `<mod>`.
/// `None` when the name carries no device tag.
pub fn resolve_modality(parsed: &ParsedName) -> Option<String> {
    let tag = device_tag(parsed)?;
    Some(match parsed.suffix.as_deref() {
        Some(suffix) => format!("{tag}_{suffix}"),
        None => tag.to_string(),
    })
}
