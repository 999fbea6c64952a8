//! Primary-listing ticker filter.
//!
//! The calendar returns foreign listings and depositary receipts alongside
//! primary US listings. This is a string heuristic with known false
//! positives (a genuine 4-letter ticker ending in Y or F is dropped); keep
//! every rule behind [`is_primary_listing`] so it can be swapped for an
//! issuer-type field.

/// Suffixes that mark depositary receipts and foreign ordinaries.
pub const DEPOSITARY_SUFFIXES: &[&str] = &[
    "ADR", "ADS", "CY", "GF", "HY", "TY", "PY", "LY", "EY", "AY", "UY",
];

/// True when `symbol` looks like a primary US listing.
pub fn is_primary_listing(symbol: &str) -> bool {
    if symbol.contains('.') {
        return false;
    }
    if DEPOSITARY_SUFFIXES.iter().any(|s| symbol.ends_with(s)) {
        return false;
    }
    !is_otc_foreign_ordinary(symbol)
}

/// Five-letter OTC style: alphabetic stem plus a trailing Y or F (TCEHY, BABAF).
fn is_otc_foreign_ordinary(symbol: &str) -> bool {
    if symbol.chars().count() <= 3 {
        return false;
    }
    match symbol.strip_suffix(&['Y', 'F'][..]) {
        Some(stem) => stem.chars().all(char::is_alphabetic),
        None => false,
    }
}
