use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A market participant: manufacturer, distributor, CMO or 3PL.
///
/// No storage-level uniqueness beyond the identity; duplicate prevention is
/// done by the exact-match probe in the service layer.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub gln: Option<String>,
    pub name_short: String,
    pub name_full: String,
    pub gcp_compliant: bool,
    pub registration_country: Option<String>,
    pub address: Option<String>,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub company_type: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::medicine::Entity")]
    Medicines,
    #[sea_orm(has_many = "super::location::Entity")]
    Locations,
}

impl Related<super::medicine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Medicines.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Locations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
