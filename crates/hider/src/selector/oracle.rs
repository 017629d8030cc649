use dom::DocumentQuery;

/// True iff `selector` matches exactly one element.
///
/// Invalid syntax counts as "not unique": ids and classes come from the
/// page and may not survive a round trip through the selector parser.
pub fn is_unique<D>(doc: &D, selector: &str) -> bool
where
    D: DocumentQuery + ?Sized,
{
    match doc.count_matches(selector) {
        Ok(count) => count == 1,
        Err(err) => {
            tracing::trace!(%selector, %err, "Selector rejected by query engine");
            false
        }
    }
}
