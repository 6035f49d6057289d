use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supply-chain operation types. Stored as text; the set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
pub enum OperationType {
    #[sea_orm(string_value = "Aggregation")]
    Aggregation,
    #[sea_orm(string_value = "Distributor")]
    Distributor,
    #[sea_orm(string_value = "Supply")]
    Supply,
    #[sea_orm(string_value = "WriteOff")]
    WriteOff,
    #[sea_orm(string_value = "Manufacturing")]
    Manufacturing,
    #[sea_orm(string_value = "Transfer")]
    Transfer,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Aggregation => "Aggregation",
            OperationType::Distributor => "Distributor",
            OperationType::Supply => "Supply",
            OperationType::WriteOff => "WriteOff",
            OperationType::Manufacturing => "Manufacturing",
            OperationType::Transfer => "Transfer",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Aggregation" => Ok(OperationType::Aggregation),
            "Distributor" => Ok(OperationType::Distributor),
            "Supply" => Ok(OperationType::Supply),
            "WriteOff" => Ok(OperationType::WriteOff),
            "Manufacturing" => Ok(OperationType::Manufacturing),
            "Transfer" => Ok(OperationType::Transfer),
            other => Err(format!("unknown operation type '{other}'")),
        }
    }
}

/// A recorded movement or transformation of a medicine at a location.
///
/// Both foreign keys are weak: deleting the referenced medicine or location is
/// blocked by the guard while operations exist, and the schema nulls the
/// reference should a row slip through anyway.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "operations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub medicine_id: Option<i32>,
    pub location_id: Option<i32>,
    pub operation_type: OperationType,
    pub operation_date: DateTime,
    pub quantity: i32,
    pub created_date: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::medicine::Entity",
        from = "Column::MedicineId",
        to = "super::medicine::Column::Id",
        on_delete = "SetNull"
    )]
    Medicine,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id",
        on_delete = "SetNull"
    )]
    Location,
}

impl Related<super::medicine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Medicine.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
