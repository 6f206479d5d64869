//! Small shared helpers.

use anyhow::{Result, anyhow};

/// Folds a list of collected errors into a single failure, or `Ok(())` when
/// the list is empty. A lone error is returned as-is; several are joined
/// into one message so none of them gets lost.
pub(crate) fn aggregate_errors(errs: Vec<anyhow::Error>) -> Result<()> {
    let mut iter = errs.into_iter();
    let Some(first) = iter.next() else {
        return Ok(());
    };
    let rest: Vec<anyhow::Error> = iter.collect();
    if rest.is_empty() {
        return Err(first);
    }

    let combined = std::iter::once(&first)
        .chain(rest.iter())
        .map(|err| format!("{err:#}"))
        .collect::<Vec<_>>()
        .join(", ");
    Err(anyhow!("{} errors occurred: [{combined}]", 1 + rest.len()))
}
