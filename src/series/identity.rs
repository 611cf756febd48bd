//! Recognizing which instances belong to the same logical series.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::obligation::ObligationInstance;

// ordered most specific first
static PARCELA_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+-\s*parcela\s+(\d+)\s*/\s*(\d+)\s*$").expect("valid parcela pattern")
});
static PAREN_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(?:-\s*)?\(\s*(\d+)\s*/\s*(\d+)\s*\)\s*$").expect("valid paren pattern")
});
static BARE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(\d+)/(\d+)\s*$").expect("valid bare pattern"));

fn suffix_patterns() -> [&'static Regex; 3] {
    [&PARCELA_SUFFIX, &PAREN_SUFFIX, &BARE_SUFFIX]
}

/// description with any installment-numbering suffix removed
///
/// Recognized suffixes: ` - Parcela n/m`, ` - (n/m)`, ` (n/m)` and a bare
/// ` n/m`. Stripping repeats until no suffix remains, so the result is a
/// fixed point: `canonicalize(canonicalize(x)) == canonicalize(x)`.
pub fn canonicalize(description: &str) -> String {
    let mut current = description.trim_end();
    'strip: loop {
        for pattern in suffix_patterns() {
            if let Some(found) = pattern.find(current) {
                current = current[..found.start()].trim_end();
                continue 'strip;
            }
        }
        break;
    }
    current.trim().to_string()
}

/// `(index, count)` encoded in a trailing installment suffix
pub fn parse_installment_suffix(description: &str) -> Option<(u32, u32)> {
    let trimmed = description.trim_end();
    suffix_patterns().into_iter().find_map(|pattern| {
        let caps = pattern.captures(trimmed)?;
        let index = caps.get(1)?.as_str().parse().ok()?;
        let count = caps.get(2)?.as_str().parse().ok()?;
        Some((index, count))
    })
}

/// label written on installment instances by the series builder
pub fn installment_label(base: &str, index: u32, count: u32) -> String {
    format!("{} - Parcela {}/{}", base.trim(), index, count)
}

/// true when the instance is part of a multi-instance series
///
/// An installment with a resolved count of 1 is a one-shot purchase and
/// never a series, whatever flags it carries.
pub fn is_true_series(instance: &ObligationInstance) -> bool {
    is_installment_series(instance) || instance.is_recurring
}

/// true when the instance is an installment of a multi-instance purchase
pub fn is_installment_series(instance: &ObligationInstance) -> bool {
    instance.is_installment
        && instance
            .resolved_installment_count()
            .map(|count| count > 1)
            .unwrap_or(false)
}
