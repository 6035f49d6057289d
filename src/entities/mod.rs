pub mod company;
pub mod location;
pub mod medicine;
pub mod operation;
pub mod user;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Closed set of reference-data tables managed by this service.
///
/// Import files and export requests address tables through this enum rather
/// than free-form strings, so an unknown table name is rejected at the edge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Companies,
    Medicines,
    Locations,
    Operations,
}

impl EntityKind {
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Companies => "companies",
            EntityKind::Medicines => "medicines",
            EntityKind::Locations => "locations",
            EntityKind::Operations => "operations",
        }
    }

    /// Resolves the target table from an import header.
    ///
    /// Convention carried over from the legacy export format: the first
    /// column of the header row is prefixed with the table name, e.g.
    /// `medicines_id`. Everything before the first underscore names the table.
    pub fn from_header(first_column: &str) -> Option<Self> {
        let prefix = first_column.split('_').next()?;
        match prefix {
            "companies" => Some(EntityKind::Companies),
            "medicines" => Some(EntityKind::Medicines),
            "locations" => Some(EntityKind::Locations),
            "operations" => Some(EntityKind::Operations),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_prefix_selects_table() {
        assert_eq!(
            EntityKind::from_header("medicines_id"),
            Some(EntityKind::Medicines)
        );
        assert_eq!(
            EntityKind::from_header("companies_gln"),
            Some(EntityKind::Companies)
        );
        assert_eq!(EntityKind::from_header("suppliers_id"), None);
        assert_eq!(EntityKind::from_header(""), None);
    }
}
