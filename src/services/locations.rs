//! Location registry service.

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::audit::AuditLog;
use crate::db::DbPool;
use crate::entities::{company, location, operation};
use crate::errors::ServiceError;
use crate::services::{changed_fields, flatten_txn, opt_eq, FetchOutcome};
use crate::validation::validate_location;

/// Fields accepted when creating or replacing a location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationInput {
    #[serde(default)]
    pub gln: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub address: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name_short: Option<String>,
    #[serde(default)]
    pub name_full: Option<String>,
    #[serde(default)]
    pub owned_by: Option<i32>,
}

/// Listing row enriched with the owning company's full name.
#[derive(Debug, Clone, Serialize)]
pub struct LocationView {
    #[serde(flatten)]
    pub location: location::Model,
    pub owned_by_name: Option<String>,
}

#[derive(Clone)]
pub struct LocationService {
    db: Arc<DbPool>,
    audit: Arc<AuditLog>,
}

impl LocationService {
    pub fn new(db: Arc<DbPool>, audit: Arc<AuditLog>) -> Self {
        Self { db, audit }
    }

    pub async fn list_all(&self) -> FetchOutcome<location::Model> {
        match location::Entity::find()
            .order_by_asc(location::Column::Id)
            .all(&*self.db)
            .await
        {
            Ok(rows) => FetchOutcome::Rows(rows),
            Err(e) => {
                tracing::error!(error = %e, "failed to load locations");
                FetchOutcome::Unavailable
            }
        }
    }

    pub async fn list_view(&self) -> FetchOutcome<LocationView> {
        let joined = location::Entity::find()
            .find_also_related(company::Entity)
            .order_by_asc(location::Column::Id)
            .all(&*self.db)
            .await;
        match joined {
            Ok(rows) => FetchOutcome::Rows(
                rows.into_iter()
                    .map(|(location, owner)| LocationView {
                        location,
                        owned_by_name: owner.map(|c| c.name_full),
                    })
                    .collect(),
            ),
            Err(e) => {
                tracing::error!(error = %e, "failed to load location view");
                FetchOutcome::Unavailable
            }
        }
    }

    pub async fn get(&self, id: i32) -> Result<location::Model, ServiceError> {
        location::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("location {id} not found")))
    }

    #[instrument(skip(self, input), fields(address = %input.address))]
    pub async fn create(&self, input: LocationInput, username: &str) -> Result<i32, ServiceError> {
        let errors = validate_location(&input);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let created = to_active_model(input).insert(&*self.db).await?;

        self.audit.record(
            "Added location",
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
        input: LocationInput,
        username: &str,
    ) -> Result<(), ServiceError> {
        let errors = validate_location(&input);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let detail = changed_fields(vec![
            ("gln", input.gln.clone().unwrap_or_default()),
            ("country", input.country.clone().unwrap_or_default()),
            ("address", input.address.clone()),
            ("role", input.role.clone().unwrap_or_default()),
            ("name_short", input.name_short.clone().unwrap_or_default()),
            ("name_full", input.name_full.clone().unwrap_or_default()),
            (
                "owned_by",
                input.owned_by.map(|v| v.to_string()).unwrap_or_default(),
            ),
        ]);

        // Edits never touch creation metadata.
        let mut model = to_active_model(input);
        model.created_date = NotSet;
        location::Entity::update_many()
            .set(model)
            .filter(location::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;

        self.audit.record(
            "Edited location",
            Some(&format!("ID: {id}, {detail}")),
            Some(username),
        );
        Ok(())
    }

    /// A location referenced by any operation cannot be deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, username: &str) -> Result<(), ServiceError> {
        self.db
            .transaction(|txn| {
                Box::pin(async move {
                    let operations = operation::Entity::find()
                        .filter(operation::Column::LocationId.eq(id))
                        .count(txn)
                        .await?;
                    if operations > 0 {
                        return Err(ServiceError::Conflict(
                            "Cannot delete a location that is referenced by operations"
                                .to_string(),
                        ));
                    }

                    let result = location::Entity::delete_by_id(id).exec(txn).await?;
                    if result.rows_affected == 0 {
                        return Err(ServiceError::NotFound(format!("location {id} not found")));
                    }
                    Ok(())
                })
            })
            .await
            .map_err(flatten_txn)?;

        self.audit.record(
            "Deleted location",
            Some(&format!("ID: {id}")),
            Some(username),
        );
        Ok(())
    }
}

/// Exact-match probe used by the bulk importer to skip duplicate rows.
pub(crate) async fn find_duplicate<C: ConnectionTrait>(
    db: &C,
    input: &LocationInput,
) -> Result<Option<location::Model>, sea_orm::DbErr> {
    location::Entity::find()
        .filter(opt_eq(location::Column::Gln, input.gln.clone()))
        .filter(opt_eq(location::Column::Country, input.country.clone()))
        .filter(location::Column::Address.eq(input.address.clone()))
        .filter(opt_eq(location::Column::Role, input.role.clone()))
        .filter(opt_eq(location::Column::NameShort, input.name_short.clone()))
        .filter(opt_eq(location::Column::NameFull, input.name_full.clone()))
        .filter(opt_eq(location::Column::OwnedBy, input.owned_by))
        .one(db)
        .await
}

pub(crate) fn to_active_model(input: LocationInput) -> location::ActiveModel {
    location::ActiveModel {
        owned_by: Set(input.owned_by),
        gln: Set(input.gln),
        country: Set(input.country),
        address: Set(input.address),
        role: Set(input.role),
        name_short: Set(input.name_short),
        name_full: Set(input.name_full),
        created_date: Set(Some(chrono::Local::now().naive_local())),
        ..Default::default()
    }
}
