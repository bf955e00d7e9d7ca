/// Prefix every human-facing ticket number carries.
pub const DISPLAY_ID_PREFIX: &str = "FIR-";

/// Allocates the next ticket number from a snapshot of the ids already
/// assigned. The scheme is advisory: two writers working from the same
/// snapshot will both produce the same number, and nothing downstream
/// rejects the duplicate. Ids that do not follow the `FIR-<n>` shape are
/// skipped rather than treated as errors.
pub fn next_display_id<I, S>(existing: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let max = existing
        .into_iter()
        .filter_map(|id| parse_sequence(id.as_ref()))
        .max()
        .unwrap_or(0);
    format_display_id(max + 1)
}

pub fn format_display_id(sequence: u32) -> String {
    format!("{}{:04}", DISPLAY_ID_PREFIX, sequence)
}

pub fn parse_sequence(display_id: &str) -> Option<u32> {
    display_id.strip_prefix(DISPLAY_ID_PREFIX)?.parse().ok()
}
