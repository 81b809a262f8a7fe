use super::job::PageResult;

const ENTRY_SEPARATOR: &str = "\n\n";

/// Join page results as `"<url>\n<content>"` entries in ascending URL order.
///
/// Pages with empty content are left out; no pages yields an empty string.
pub fn aggregate(mut results: Vec<PageResult>) -> String {
    results.retain(|page| !page.content.is_empty());
    results.sort_by(|a, b| a.url.as_bytes().cmp(b.url.as_bytes()));

    results
        .iter()
        .map(|page| format!("{}\n{}", page.url, page.content))
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}
