use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A storage or distribution facility (warehouse, production site, distributor).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub owned_by: Option<i32>,
    pub gln: Option<String>,
    pub country: Option<String>,
    pub address: String,
    pub role: Option<String>,
    pub name_short: Option<String>,
    pub name_full: Option<String>,
    pub created_date: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::OwnedBy",
        to = "super::company::Column::Id",
        on_delete = "SetNull"
    )]
    Company,
    #[sea_orm(has_many = "super::operation::Entity")]
    Operations,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::operation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
