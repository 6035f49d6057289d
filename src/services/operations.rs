//! Supply-chain operations journal service.

use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use crate::audit::AuditLog;
use crate::db::DbPool;
use crate::entities::operation::OperationType;
use crate::entities::{location, medicine, operation};
use crate::errors::ServiceError;
use crate::services::{changed_fields, opt_eq, FetchOutcome};
use crate::validation::validate_operation;

/// Fields accepted when creating or replacing an operation.
///
/// References and the type are optional at the wire level so the validator
/// can report every missing field by name instead of a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationInput {
    #[serde(default)]
    pub medicine_id: Option<i32>,
    #[serde(default)]
    pub location_id: Option<i32>,
    #[serde(default)]
    pub operation_type: Option<OperationType>,
    #[serde(default)]
    pub operation_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub quantity: i32,
}

/// Journal row with the medicine and location names resolved.
#[derive(Debug, Clone, Serialize)]
pub struct OperationView {
    #[serde(flatten)]
    pub operation: operation::Model,
    pub medicine_name: Option<String>,
    pub location_name: Option<String>,
}

#[derive(Clone)]
pub struct OperationService {
    db: Arc<DbPool>,
    audit: Arc<AuditLog>,
}

impl OperationService {
    pub fn new(db: Arc<DbPool>, audit: Arc<AuditLog>) -> Self {
        Self { db, audit }
    }

    pub async fn list_all(&self) -> FetchOutcome<operation::Model> {
        match operation::Entity::find()
            .order_by_asc(operation::Column::Id)
            .all(&*self.db)
            .await
        {
            Ok(rows) => FetchOutcome::Rows(rows),
            Err(e) => {
                tracing::error!(error = %e, "failed to load operations");
                FetchOutcome::Unavailable
            }
        }
    }

    /// Journal joined with medicine and location names.
    ///
    /// The reference tables degrade independently: if medicines cannot be
    /// loaded the journal still renders, just without resolved names.
    pub async fn list_view(&self) -> FetchOutcome<OperationView> {
        let rows = match operation::Entity::find()
            .order_by_asc(operation::Column::Id)
            .all(&*self.db)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "failed to load operations");
                return FetchOutcome::Unavailable;
            }
        };

        let medicine_names: HashMap<i32, String> = medicine::Entity::find()
            .all(&*self.db)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();
        let location_names: HashMap<i32, String> = location::Entity::find()
            .all(&*self.db)
            .await
            .unwrap_or_default()
            .into_iter()
            .filter_map(|l| {
                let name = l.name_short.or(l.name_full)?;
                Some((l.id, name))
            })
            .collect();

        FetchOutcome::Rows(
            rows.into_iter()
                .map(|operation| OperationView {
                    medicine_name: operation
                        .medicine_id
                        .and_then(|id| medicine_names.get(&id).cloned()),
                    location_name: operation
                        .location_id
                        .and_then(|id| location_names.get(&id).cloned()),
                    operation,
                })
                .collect(),
        )
    }

    pub async fn get(&self, id: i32) -> Result<operation::Model, ServiceError> {
        operation::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("operation {id} not found")))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: OperationInput, username: &str) -> Result<i32, ServiceError> {
        let errors = validate_operation(&input);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let created = to_active_model(input).insert(&*self.db).await?;

        self.audit.record(
            "Added operation",
            Some(&format!("ID: {}", created.id)),
            Some(username),
        );
        Ok(created.id)
    }

    /// Full-row replacement; updating a missing id is a silent no-op.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: OperationInput,
        username: &str,
    ) -> Result<(), ServiceError> {
        let errors = validate_operation(&input);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let detail = changed_fields(vec![
            (
                "medicine_id",
                input.medicine_id.map(|v| v.to_string()).unwrap_or_default(),
            ),
            (
                "location_id",
                input.location_id.map(|v| v.to_string()).unwrap_or_default(),
            ),
            (
                "operation_type",
                input
                    .operation_type
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
            ),
            (
                "operation_date",
                input
                    .operation_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            ),
            ("quantity", input.quantity.to_string()),
        ]);

        // Edits never touch creation metadata.
        let mut model = to_active_model(input);
        model.created_date = NotSet;
        operation::Entity::update_many()
            .set(model)
            .filter(operation::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;

        self.audit.record(
            "Edited operation",
            Some(&format!("ID: {id}, {detail}")),
            Some(username),
        );
        Ok(())
    }

    /// Journal entries reference nothing else, so deletion is unguarded.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, username: &str) -> Result<(), ServiceError> {
        let result = operation::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("operation {id} not found")));
        }

        self.audit.record(
            "Deleted operation",
            Some(&format!("ID: {id}")),
            Some(username),
        );
        Ok(())
    }
}

/// Exact-match probe used by the bulk importer to skip duplicate rows.
pub(crate) async fn find_duplicate<C: ConnectionTrait>(
    db: &C,
    input: &OperationInput,
) -> Result<Option<operation::Model>, sea_orm::DbErr> {
    let mut query = operation::Entity::find()
        .filter(opt_eq(operation::Column::MedicineId, input.medicine_id))
        .filter(opt_eq(operation::Column::LocationId, input.location_id))
        .filter(operation::Column::Quantity.eq(input.quantity));
    if let Some(kind) = input.operation_type {
        query = query.filter(operation::Column::OperationType.eq(kind));
    }
    if let Some(date) = input.operation_date {
        query = query.filter(operation::Column::OperationDate.eq(date));
    }
    query.one(db).await
}

pub(crate) fn to_active_model(input: OperationInput) -> operation::ActiveModel {
    operation::ActiveModel {
        medicine_id: Set(input.medicine_id),
        location_id: Set(input.location_id),
        // Validation guarantees both are present on all insert paths.
        operation_type: Set(input.operation_type.unwrap_or(OperationType::Supply)),
        operation_date: Set(input
            .operation_date
            .unwrap_or(NaiveDateTime::MIN)),
        quantity: Set(input.quantity),
        created_date: Set(Some(chrono::Local::now().naive_local())),
        ..Default::default()
    }
}
