use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A tracked medicinal product.
///
/// `owned_by` is a weak reference to the owning company; the schema nulls it
/// on company deletion, though the deletion guard blocks that path while any
/// medicine still points at the company.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "medicines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub owned_by: Option<i32>,
    pub name: String,
    pub gtin: String,
    pub sku: String,
    pub market: String,
    pub shared: bool,
    pub batch_number: String,
    pub expiration_date: Date,
    pub dosage_form: String,
    pub active_ingredient: String,
    pub package_size: String,
    pub atc_code: Option<String>,
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
