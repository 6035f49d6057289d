//! Medicine catalog service.

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::audit::AuditLog;
use crate::db::DbPool;
use crate::entities::{company, medicine, operation};
use crate::errors::ServiceError;
use crate::services::{changed_fields, flatten_txn, opt_eq, FetchOutcome};
use crate::validation::validate_medicine;

/// Fields accepted when creating or replacing a medicine.
///
/// GTIN and SKU are deliberately not unique in storage: the same product is
/// listed once per market. Duplicate prevention is full-row equality only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicineInput {
    pub name: String,
    pub gtin: String,
    pub sku: String,
    pub market: String,
    pub batch_number: String,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    pub dosage_form: String,
    pub active_ingredient: String,
    pub package_size: String,
    #[serde(default)]
    pub owned_by: Option<i32>,
    #[serde(default)]
    pub atc_code: Option<String>,
}

/// Listing row enriched with the owning company's full name.
#[derive(Debug, Clone, Serialize)]
pub struct MedicineView {
    #[serde(flatten)]
    pub medicine: medicine::Model,
    pub owned_by_name: Option<String>,
}

#[derive(Clone)]
pub struct MedicineService {
    db: Arc<DbPool>,
    audit: Arc<AuditLog>,
}

impl MedicineService {
    pub fn new(db: Arc<DbPool>, audit: Arc<AuditLog>) -> Self {
        Self { db, audit }
    }

    pub async fn list_all(&self) -> FetchOutcome<medicine::Model> {
        match medicine::Entity::find()
            .order_by_asc(medicine::Column::Id)
            .all(&*self.db)
            .await
        {
            Ok(rows) => FetchOutcome::Rows(rows),
            Err(e) => {
                tracing::error!(error = %e, "failed to load medicines");
                FetchOutcome::Unavailable
            }
        }
    }

    /// Listing joined with the owning company, for the viewing screens.
    pub async fn list_view(&self) -> FetchOutcome<MedicineView> {
        let joined = medicine::Entity::find()
            .find_also_related(company::Entity)
            .order_by_asc(medicine::Column::Id)
            .all(&*self.db)
            .await;
        match joined {
            Ok(rows) => FetchOutcome::Rows(
                rows.into_iter()
                    .map(|(medicine, owner)| MedicineView {
                        medicine,
                        owned_by_name: owner.map(|c| c.name_full),
                    })
                    .collect(),
            ),
            Err(e) => {
                tracing::error!(error = %e, "failed to load medicine view");
                FetchOutcome::Unavailable
            }
        }
    }

    pub async fn get(&self, id: i32) -> Result<medicine::Model, ServiceError> {
        medicine::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("medicine {id} not found")))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: MedicineInput, username: &str) -> Result<i32, ServiceError> {
        let errors = validate_medicine(&input);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let id = self
            .db
            .transaction(|txn| {
                Box::pin(async move {
                    if find_duplicate(txn, &input).await?.is_some() {
                        return Err(ServiceError::Conflict(
                            "An identical medicine already exists".to_string(),
                        ));
                    }
                    let created = to_active_model(input).insert(txn).await?;
                    Ok(created.id)
                })
            })
            .await
            .map_err(flatten_txn)?;

        self.audit
            .record("Added medicine", Some(&format!("ID: {id}")), Some(username));
        Ok(id)
    }

    /// Full-row replacement. The GTIN+SKU pair must not collide with another
    /// medicine; updating a missing id is a silent no-op.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: MedicineInput,
        username: &str,
    ) -> Result<(), ServiceError> {
        let errors = validate_medicine(&input);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let detail = changed_fields(vec![
            ("name", input.name.clone()),
            ("gtin", input.gtin.clone()),
            ("sku", input.sku.clone()),
            ("market", input.market.clone()),
            ("batch_number", input.batch_number.clone()),
            (
                "expiration_date",
                input
                    .expiration_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            ),
            ("dosage_form", input.dosage_form.clone()),
            ("active_ingredient", input.active_ingredient.clone()),
            ("package_size", input.package_size.clone()),
            ("atc_code", input.atc_code.clone().unwrap_or_default()),
            (
                "owned_by",
                input.owned_by.map(|v| v.to_string()).unwrap_or_default(),
            ),
        ]);

        self.db
            .transaction(|txn| {
                Box::pin(async move {
                    let conflict = medicine::Entity::find()
                        .filter(medicine::Column::Id.ne(id))
                        .filter(medicine::Column::Gtin.eq(input.gtin.clone()))
                        .filter(medicine::Column::Sku.eq(input.sku.clone()))
                        .one(txn)
                        .await?;
                    if conflict.is_some() {
                        return Err(ServiceError::Conflict(
                            "A medicine with this GTIN and SKU already exists".to_string(),
                        ));
                    }

                    // Edits never touch creation metadata or the shared flag.
                    let mut model = to_active_model(input);
                    model.shared = NotSet;
                    model.created_date = NotSet;
                    medicine::Entity::update_many()
                        .set(model)
                        .filter(medicine::Column::Id.eq(id))
                        .exec(txn)
                        .await?;
                    Ok(())
                })
            })
            .await
            .map_err(flatten_txn)?;

        self.audit.record(
            "Edited medicine",
            Some(&format!("ID: {id}, {detail}")),
            Some(username),
        );
        Ok(())
    }

    /// A medicine referenced by any operation cannot be deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, username: &str) -> Result<(), ServiceError> {
        self.db
            .transaction(|txn| {
                Box::pin(async move {
                    let operations = operation::Entity::find()
                        .filter(operation::Column::MedicineId.eq(id))
                        .count(txn)
                        .await?;
                    if operations > 0 {
                        return Err(ServiceError::Conflict(
                            "Cannot delete a medicine that is referenced by operations"
                                .to_string(),
                        ));
                    }

                    let result = medicine::Entity::delete_by_id(id).exec(txn).await?;
                    if result.rows_affected == 0 {
                        return Err(ServiceError::NotFound(format!("medicine {id} not found")));
                    }
                    Ok(())
                })
            })
            .await
            .map_err(flatten_txn)?;

        self.audit.record(
            "Deleted medicine",
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
    input: &MedicineInput,
) -> Result<Option<medicine::Model>, sea_orm::DbErr> {
    let mut query = medicine::Entity::find()
        .filter(medicine::Column::Name.eq(input.name.clone()))
        .filter(medicine::Column::Gtin.eq(input.gtin.clone()))
        .filter(medicine::Column::Sku.eq(input.sku.clone()))
        .filter(medicine::Column::Market.eq(input.market.clone()))
        .filter(medicine::Column::BatchNumber.eq(input.batch_number.clone()))
        .filter(medicine::Column::DosageForm.eq(input.dosage_form.clone()))
        .filter(medicine::Column::ActiveIngredient.eq(input.active_ingredient.clone()))
        .filter(medicine::Column::PackageSize.eq(input.package_size.clone()))
        .filter(opt_eq(medicine::Column::OwnedBy, input.owned_by))
        .filter(opt_eq(medicine::Column::AtcCode, input.atc_code.clone()));
    if let Some(date) = input.expiration_date {
        query = query.filter(medicine::Column::ExpirationDate.eq(date));
    }
    query.one(db).await
}

pub(crate) fn to_active_model(input: MedicineInput) -> medicine::ActiveModel {
    medicine::ActiveModel {
        owned_by: Set(input.owned_by),
        name: Set(input.name),
        gtin: Set(input.gtin),
        sku: Set(input.sku),
        market: Set(input.market),
        shared: Set(false),
        batch_number: Set(input.batch_number),
        // Validation guarantees the date is present on all insert paths.
        expiration_date: Set(input
            .expiration_date
            .unwrap_or(NaiveDate::MIN)),
        dosage_form: Set(input.dosage_form),
        active_ingredient: Set(input.active_ingredient),
        package_size: Set(input.package_size),
        atc_code: Set(input.atc_code),
        created_date: Set(Some(chrono::Local::now().naive_local())),
        ..Default::default()
    }
}
