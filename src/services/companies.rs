//! Company registry service.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::audit::AuditLog;
use crate::db::DbPool;
use crate::entities::{company, location, medicine};
use crate::errors::ServiceError;
use crate::services::{changed_fields, flatten_txn, opt_eq, FetchOutcome};
use crate::validation::validate_company;

/// Fields accepted when creating or replacing a company.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyInput {
    #[serde(default)]
    pub gln: Option<String>,
    pub name_short: String,
    pub name_full: String,
    #[serde(default)]
    pub gcp_compliant: bool,
    #[serde(default)]
    pub registration_country: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "type")]
    pub company_type: Option<String>,
}

#[derive(Clone)]
pub struct CompanyService {
    db: Arc<DbPool>,
    audit: Arc<AuditLog>,
}

impl CompanyService {
    pub fn new(db: Arc<DbPool>, audit: Arc<AuditLog>) -> Self {
        Self { db, audit }
    }

    /// Full table scan. A failing store degrades to `Unavailable`, never to
    /// an error, so read-only screens keep rendering.
    pub async fn list_all(&self) -> FetchOutcome<company::Model> {
        match company::Entity::find()
            .order_by_asc(company::Column::Id)
            .all(&*self.db)
            .await
        {
            Ok(rows) => FetchOutcome::Rows(rows),
            Err(e) => {
                tracing::error!(error = %e, "failed to load companies");
                FetchOutcome::Unavailable
            }
        }
    }

    pub async fn get(&self, id: i32) -> Result<company::Model, ServiceError> {
        company::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("company {id} not found")))
    }

    /// Validates, rejects exact duplicates and inserts, all in one
    /// transaction so two identical concurrent submissions cannot both land.
    #[instrument(skip(self, input), fields(name = %input.name_short))]
    pub async fn create(&self, input: CompanyInput, username: &str) -> Result<i32, ServiceError> {
        let errors = validate_company(&input);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let id = self
            .db
            .transaction(|txn| {
                Box::pin(async move {
                    if find_duplicate(txn, &input).await?.is_some() {
                        return Err(ServiceError::Conflict(
                            "An identical company already exists".to_string(),
                        ));
                    }
                    let created = to_active_model(input).insert(txn).await?;
                    Ok(created.id)
                })
            })
            .await
            .map_err(flatten_txn)?;

        self.audit
            .record("Added company", Some(&format!("ID: {id}")), Some(username));
        Ok(id)
    }

    /// Full-row replacement. GLN and full name must stay unique across other
    /// companies; updating a missing id is a silent no-op.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: CompanyInput,
        username: &str,
    ) -> Result<(), ServiceError> {
        let errors = validate_company(&input);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let detail = changed_fields(vec![
            ("gln", input.gln.clone().unwrap_or_default()),
            ("name_short", input.name_short.clone()),
            ("name_full", input.name_full.clone()),
            ("gcp_compliant", input.gcp_compliant.to_string()),
            (
                "registration_country",
                input.registration_country.clone().unwrap_or_default(),
            ),
            ("address", input.address.clone().unwrap_or_default()),
            ("type", input.company_type.clone().unwrap_or_default()),
        ]);

        self.db
            .transaction(|txn| {
                Box::pin(async move {
                    let conflict = company::Entity::find()
                        .filter(company::Column::Id.ne(id))
                        .filter(company::Column::Gln.eq(input.gln.clone()))
                        .filter(company::Column::NameFull.eq(input.name_full.clone()))
                        .one(txn)
                        .await?;
                    if conflict.is_some() {
                        return Err(ServiceError::Conflict(
                            "A company with this GLN and full name already exists".to_string(),
                        ));
                    }

                    company::Entity::update_many()
                        .set(to_active_model(input))
                        .filter(company::Column::Id.eq(id))
                        .exec(txn)
                        .await?;
                    Ok(())
                })
            })
            .await
            .map_err(flatten_txn)?;

        self.audit.record(
            "Edited company",
            Some(&format!("ID: {id}, {detail}")),
            Some(username),
        );
        Ok(())
    }

    /// Deletion guard: a company still owning medicines or locations cannot
    /// be removed. Count and delete run in the same transaction.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, username: &str) -> Result<(), ServiceError> {
        self.db
            .transaction(|txn| {
                Box::pin(async move {
                    let medicines = medicine::Entity::find()
                        .filter(medicine::Column::OwnedBy.eq(id))
                        .count(txn)
                        .await?;
                    let locations = location::Entity::find()
                        .filter(location::Column::OwnedBy.eq(id))
                        .count(txn)
                        .await?;
                    if medicines > 0 || locations > 0 {
                        return Err(ServiceError::Conflict(
                            "Cannot delete a company that still owns medicines or locations"
                                .to_string(),
                        ));
                    }

                    let result = company::Entity::delete_by_id(id).exec(txn).await?;
                    if result.rows_affected == 0 {
                        return Err(ServiceError::NotFound(format!("company {id} not found")));
                    }
                    Ok(())
                })
            })
            .await
            .map_err(flatten_txn)?;

        self.audit.record(
            "Deleted company",
            Some(&format!("ID: {id}")),
            Some(username),
        );
        Ok(())
    }
}

/// Exact-match probe over every user-supplied field; absent optional fields
/// match stored NULLs.
pub(crate) async fn find_duplicate<C: ConnectionTrait>(
    db: &C,
    input: &CompanyInput,
) -> Result<Option<company::Model>, sea_orm::DbErr> {
    company::Entity::find()
        .filter(opt_eq(company::Column::Gln, input.gln.clone()))
        .filter(company::Column::NameShort.eq(input.name_short.clone()))
        .filter(company::Column::NameFull.eq(input.name_full.clone()))
        .filter(company::Column::GcpCompliant.eq(input.gcp_compliant))
        .filter(opt_eq(
            company::Column::RegistrationCountry,
            input.registration_country.clone(),
        ))
        .filter(opt_eq(company::Column::Address, input.address.clone()))
        .filter(opt_eq(
            company::Column::CompanyType,
            input.company_type.clone(),
        ))
        .one(db)
        .await
}

pub(crate) fn to_active_model(input: CompanyInput) -> company::ActiveModel {
    company::ActiveModel {
        gln: Set(input.gln),
        name_short: Set(input.name_short),
        name_full: Set(input.name_full),
        gcp_compliant: Set(input.gcp_compliant),
        registration_country: Set(input.registration_country),
        address: Set(input.address),
        company_type: Set(input.company_type),
        ..Default::default()
    }
}
