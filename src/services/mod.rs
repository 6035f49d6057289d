pub mod companies;
pub mod import_export;
pub mod locations;
pub mod medicines;
pub mod operations;

use crate::errors::ServiceError;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ColumnTrait, TransactionError, Value};

/// Result of a full-table scan.
///
/// The legacy dashboard collapsed "no rows" and "store unreachable" into one
/// empty frame. The distinction is kept here; only the listing endpoints
/// degrade `Unavailable` to an empty collection for compatibility.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Rows(Vec<T>),
    Unavailable,
}

impl<T> FetchOutcome<T> {
    pub fn into_rows(self) -> Vec<T> {
        match self {
            FetchOutcome::Rows(rows) => rows,
            FetchOutcome::Unavailable => Vec::new(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FetchOutcome::Unavailable)
    }

    pub fn map_rows<U>(self, f: impl FnMut(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Rows(rows) => FetchOutcome::Rows(rows.into_iter().map(f).collect()),
            FetchOutcome::Unavailable => FetchOutcome::Unavailable,
        }
    }
}

/// Null-aware equality for the duplicate probes: `col = value` when the
/// field is present, `col IS NULL` when it is absent. A plain `eq(None)`
/// renders `= NULL` and matches nothing.
pub(crate) fn opt_eq<C, V>(col: C, value: Option<V>) -> SimpleExpr
where
    C: ColumnTrait,
    V: Into<Value>,
{
    match value {
        Some(v) => col.eq(v),
        None => col.is_null(),
    }
}

pub(crate) fn flatten_txn(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(e) => e.into(),
        TransactionError::Transaction(e) => e,
    }
}

/// Renders `k=v` pairs for audit details, dropping empty values the way the
/// legacy edit log did.
pub(crate) fn changed_fields(pairs: Vec<(&str, String)>) -> String {
    pairs
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_outcome_degrades_to_empty() {
        let ok: FetchOutcome<i32> = FetchOutcome::Rows(vec![1, 2]);
        assert_eq!(ok.into_rows(), vec![1, 2]);

        let gone: FetchOutcome<i32> = FetchOutcome::Unavailable;
        assert!(gone.is_unavailable());
        assert!(gone.into_rows().is_empty());
    }

    #[test]
    fn changed_fields_skips_empty_values() {
        let detail = changed_fields(vec![
            ("gln", "4600000000001".to_string()),
            ("address", String::new()),
            ("type", "manufacturer".to_string()),
        ]);
        assert_eq!(detail, "gln=4600000000001, type=manufacturer");
    }
}
