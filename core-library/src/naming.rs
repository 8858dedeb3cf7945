//! Display names for imported documents.

const DOCUMENT_EXTENSION: &str = ".pdf";

/// Derive an item's display name from the imported file name.
///
/// A single trailing `.pdf` is removed regardless of case. A name that would
/// become blank is kept as given.
pub fn display_name(file_name: &str) -> String {
    let trimmed = file_name.trim();
    let split = trimmed.len().saturating_sub(DOCUMENT_EXTENSION.len());

    match (trimmed.get(..split), trimmed.get(split..)) {
        (Some(stem), Some(extension))
            if extension.eq_ignore_ascii_case(DOCUMENT_EXTENSION) && !stem.trim().is_empty() =>
        {
            stem.to_string()
        }
        _ => trimmed.to_string(),
    }
}
