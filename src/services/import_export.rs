//! Bulk CSV import and export.
//!
//! The file format is self-describing: the first header column carries the
//! table name as a prefix (`medicines_id`, `companies_id`, ...), which is how
//! exported files round-trip back through the importer. All rows of one file
//! land in a single transaction; a bad row rolls the whole file back.

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder, Set, TransactionTrait};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::audit::AuditLog;
use crate::db::DbPool;
use crate::entities::operation::OperationType;
use crate::entities::{company, location, medicine, operation, EntityKind};
use crate::errors::ServiceError;
use crate::services::flatten_txn;
use crate::services::{companies, locations, medicines, operations};
use crate::services::companies::CompanyInput;
use crate::services::locations::LocationInput;
use crate::services::medicines::MedicineInput;
use crate::services::operations::OperationInput;
use crate::validation::{
    validate_company, validate_location, validate_medicine, validate_operation,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub table: EntityKind,
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct ImportExportService {
    db: Arc<DbPool>,
    audit: Arc<AuditLog>,
}

impl ImportExportService {
    pub fn new(db: Arc<DbPool>, audit: Arc<AuditLog>) -> Self {
        Self { db, audit }
    }

    /// Imports one CSV file. The target table is resolved from the header;
    /// rows identical to an existing row are skipped, everything else is
    /// validated and inserted. One transaction covers the whole file.
    #[instrument(skip(self, content))]
    pub async fn import_csv(
        &self,
        content: &str,
        username: &str,
    ) -> Result<ImportSummary, ServiceError> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| ServiceError::BadRequest(format!("invalid CSV: {e}")))?
            .clone();
        let first = headers
            .get(0)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ServiceError::BadRequest("empty CSV header row".to_string()))?;
        let kind = EntityKind::from_header(first).ok_or_else(|| {
            ServiceError::BadRequest(format!(
                "cannot determine the target table from column '{first}'"
            ))
        })?;

        let records: Vec<StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .map_err(|e| ServiceError::BadRequest(format!("invalid CSV: {e}")))?;

        let (imported, skipped) = self
            .db
            .transaction(|txn| {
                Box::pin(async move {
                    match kind {
                        EntityKind::Companies => import_companies(txn, &headers, &records).await,
                        EntityKind::Medicines => import_medicines(txn, &headers, &records).await,
                        EntityKind::Locations => import_locations(txn, &headers, &records).await,
                        EntityKind::Operations => import_operations(txn, &headers, &records).await,
                    }
                })
            })
            .await
            .map_err(flatten_txn)?;

        info!(table = kind.table_name(), imported, skipped, "import finished");
        self.audit.record(
            &format!("Imported data into {}", kind.table_name()),
            Some(&format!("Rows: {imported}, Skipped: {skipped}")),
            Some(username),
        );
        Ok(ImportSummary {
            table: kind,
            imported,
            skipped,
        })
    }

    /// Exports a full table as CSV, in the header convention the importer
    /// understands.
    #[instrument(skip(self))]
    pub async fn export_csv(
        &self,
        kind: EntityKind,
        username: &str,
    ) -> Result<String, ServiceError> {
        let csv = match kind {
            EntityKind::Companies => export_companies(&self.db).await?,
            EntityKind::Medicines => export_medicines(&self.db).await?,
            EntityKind::Locations => export_locations(&self.db).await?,
            EntityKind::Operations => export_operations(&self.db).await?,
        };

        self.audit.record(
            &format!("Exported data from {}", kind.table_name()),
            None,
            Some(username),
        );
        Ok(csv)
    }
}

// --- row parsing -----------------------------------------------------------

fn field(headers: &StringRecord, record: &StringRecord, name: &str) -> Option<String> {
    let idx = headers.iter().position(|h| h == name)?;
    let value = record.get(idx)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn text(headers: &StringRecord, record: &StringRecord, name: &str) -> String {
    field(headers, record, name).unwrap_or_default()
}

fn parse_bool(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn parse_i32(value: Option<String>, name: &str, row: usize) -> Result<Option<i32>, ServiceError> {
    match value {
        None => Ok(None),
        Some(v) => v.parse::<i32>().map(Some).map_err(|_| {
            ServiceError::Validation(vec![format!("row {row}: {name} is not a number")])
        }),
    }
}

fn parse_date(
    value: Option<String>,
    name: &str,
    row: usize,
) -> Result<Option<NaiveDate>, ServiceError> {
    match value {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(&v, DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                ServiceError::Validation(vec![format!(
                    "row {row}: {name} is not a date in {DATE_FORMAT} format"
                )])
            }),
    }
}

fn parse_datetime(
    value: Option<String>,
    name: &str,
    row: usize,
) -> Result<Option<NaiveDateTime>, ServiceError> {
    match value {
        None => Ok(None),
        Some(v) => NaiveDateTime::parse_from_str(&v, DATETIME_FORMAT)
            .or_else(|_| {
                NaiveDate::parse_from_str(&v, DATE_FORMAT)
                    .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or(NaiveDateTime::MIN))
            })
            .map(Some)
            .map_err(|_| {
                ServiceError::Validation(vec![format!(
                    "row {row}: {name} is not a timestamp in {DATETIME_FORMAT} format"
                )])
            }),
    }
}

fn row_errors(errors: Vec<String>, row: usize) -> ServiceError {
    ServiceError::Validation(errors.into_iter().map(|e| format!("row {row}: {e}")).collect())
}

// --- per-table import ------------------------------------------------------

async fn import_companies(
    txn: &impl ConnectionTrait,
    headers: &StringRecord,
    records: &[StringRecord],
) -> Result<(usize, usize), ServiceError> {
    let mut imported = 0;
    let mut skipped = 0;
    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        let input = CompanyInput {
            gln: field(headers, record, "gln"),
            name_short: text(headers, record, "name_short"),
            name_full: text(headers, record, "name_full"),
            gcp_compliant: parse_bool(field(headers, record, "gcp_compliant")),
            registration_country: field(headers, record, "registration_country"),
            address: field(headers, record, "address"),
            company_type: field(headers, record, "type"),
        };
        let errors = validate_company(&input);
        if !errors.is_empty() {
            return Err(row_errors(errors, row));
        }
        if companies::find_duplicate(txn, &input).await?.is_some() {
            skipped += 1;
            continue;
        }
        companies::to_active_model(input).insert(txn).await?;
        imported += 1;
    }
    Ok((imported, skipped))
}

async fn import_medicines(
    txn: &impl ConnectionTrait,
    headers: &StringRecord,
    records: &[StringRecord],
) -> Result<(usize, usize), ServiceError> {
    let mut imported = 0;
    let mut skipped = 0;
    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        let input = MedicineInput {
            name: text(headers, record, "name"),
            gtin: text(headers, record, "gtin"),
            sku: text(headers, record, "sku"),
            market: text(headers, record, "market"),
            batch_number: text(headers, record, "batch_number"),
            expiration_date: parse_date(
                field(headers, record, "expiration_date"),
                "expiration_date",
                row,
            )?,
            dosage_form: text(headers, record, "dosage_form"),
            active_ingredient: text(headers, record, "active_ingredient"),
            package_size: text(headers, record, "package_size"),
            owned_by: parse_i32(field(headers, record, "owned_by"), "owned_by", row)?,
            atc_code: field(headers, record, "atc_code"),
        };
        let errors = validate_medicine(&input);
        if !errors.is_empty() {
            return Err(row_errors(errors, row));
        }
        if medicines::find_duplicate(txn, &input).await?.is_some() {
            skipped += 1;
            continue;
        }
        let mut model = medicines::to_active_model(input);
        model.shared = Set(parse_bool(field(headers, record, "shared")));
        model.insert(txn).await?;
        imported += 1;
    }
    Ok((imported, skipped))
}

async fn import_locations(
    txn: &impl ConnectionTrait,
    headers: &StringRecord,
    records: &[StringRecord],
) -> Result<(usize, usize), ServiceError> {
    let mut imported = 0;
    let mut skipped = 0;
    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        let input = LocationInput {
            gln: field(headers, record, "gln"),
            country: field(headers, record, "country"),
            address: text(headers, record, "address"),
            role: field(headers, record, "role"),
            name_short: field(headers, record, "name_short"),
            name_full: field(headers, record, "name_full"),
            owned_by: parse_i32(field(headers, record, "owned_by"), "owned_by", row)?,
        };
        let errors = validate_location(&input);
        if !errors.is_empty() {
            return Err(row_errors(errors, row));
        }
        if locations::find_duplicate(txn, &input).await?.is_some() {
            skipped += 1;
            continue;
        }
        locations::to_active_model(input).insert(txn).await?;
        imported += 1;
    }
    Ok((imported, skipped))
}

async fn import_operations(
    txn: &impl ConnectionTrait,
    headers: &StringRecord,
    records: &[StringRecord],
) -> Result<(usize, usize), ServiceError> {
    let mut imported = 0;
    let mut skipped = 0;
    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        let operation_type = match field(headers, record, "operation_type") {
            None => None,
            Some(v) => Some(v.parse::<OperationType>().map_err(|e| {
                ServiceError::Validation(vec![format!("row {row}: {e}")])
            })?),
        };
        let input = OperationInput {
            medicine_id: parse_i32(field(headers, record, "medicine_id"), "medicine_id", row)?,
            location_id: parse_i32(field(headers, record, "location_id"), "location_id", row)?,
            operation_type,
            operation_date: parse_datetime(
                field(headers, record, "operation_date"),
                "operation_date",
                row,
            )?,
            quantity: parse_i32(field(headers, record, "quantity"), "quantity", row)?
                .unwrap_or_default(),
        };
        let errors = validate_operation(&input);
        if !errors.is_empty() {
            return Err(row_errors(errors, row));
        }
        if operations::find_duplicate(txn, &input).await?.is_some() {
            skipped += 1;
            continue;
        }
        operations::to_active_model(input).insert(txn).await?;
        imported += 1;
    }
    Ok((imported, skipped))
}

// --- per-table export ------------------------------------------------------

fn writer() -> csv::Writer<Vec<u8>> {
    csv::Writer::from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ServiceError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::InternalError(format!("CSV serialization failed: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| ServiceError::InternalError(format!("CSV is not valid UTF-8: {e}")))
}

fn opt(value: Option<String>) -> String {
    value.unwrap_or_default()
}

fn opt_datetime(value: Option<NaiveDateTime>) -> String {
    value
        .map(|v| v.format(DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}

async fn export_companies(db: &DbPool) -> Result<String, ServiceError> {
    let mut w = writer();
    w.write_record([
        "companies_id",
        "gln",
        "name_short",
        "name_full",
        "gcp_compliant",
        "registration_country",
        "address",
        "type",
    ])
    .map_err(csv_error)?;
    for row in company::Entity::find()
        .order_by_asc(company::Column::Id)
        .all(db)
        .await?
    {
        w.write_record([
            row.id.to_string(),
            opt(row.gln),
            row.name_short,
            row.name_full,
            row.gcp_compliant.to_string(),
            opt(row.registration_country),
            opt(row.address),
            opt(row.company_type),
        ])
        .map_err(csv_error)?;
    }
    finish(w)
}

async fn export_medicines(db: &DbPool) -> Result<String, ServiceError> {
    let mut w = writer();
    w.write_record([
        "medicines_id",
        "owned_by",
        "name",
        "gtin",
        "sku",
        "market",
        "shared",
        "batch_number",
        "expiration_date",
        "dosage_form",
        "active_ingredient",
        "package_size",
        "atc_code",
        "created_date",
    ])
    .map_err(csv_error)?;
    for row in medicine::Entity::find()
        .order_by_asc(medicine::Column::Id)
        .all(db)
        .await?
    {
        w.write_record([
            row.id.to_string(),
            row.owned_by.map(|v| v.to_string()).unwrap_or_default(),
            row.name,
            row.gtin,
            row.sku,
            row.market,
            row.shared.to_string(),
            row.batch_number,
            row.expiration_date.format(DATE_FORMAT).to_string(),
            row.dosage_form,
            row.active_ingredient,
            row.package_size,
            opt(row.atc_code),
            opt_datetime(row.created_date),
        ])
        .map_err(csv_error)?;
    }
    finish(w)
}

async fn export_locations(db: &DbPool) -> Result<String, ServiceError> {
    let mut w = writer();
    w.write_record([
        "locations_id",
        "owned_by",
        "gln",
        "country",
        "address",
        "role",
        "name_short",
        "name_full",
        "created_date",
    ])
    .map_err(csv_error)?;
    for row in location::Entity::find()
        .order_by_asc(location::Column::Id)
        .all(db)
        .await?
    {
        w.write_record([
            row.id.to_string(),
            row.owned_by.map(|v| v.to_string()).unwrap_or_default(),
            opt(row.gln),
            opt(row.country),
            row.address,
            opt(row.role),
            opt(row.name_short),
            opt(row.name_full),
            opt_datetime(row.created_date),
        ])
        .map_err(csv_error)?;
    }
    finish(w)
}

async fn export_operations(db: &DbPool) -> Result<String, ServiceError> {
    let mut w = writer();
    w.write_record([
        "operations_id",
        "medicine_id",
        "location_id",
        "operation_type",
        "operation_date",
        "quantity",
        "created_date",
    ])
    .map_err(csv_error)?;
    for row in operation::Entity::find()
        .order_by_asc(operation::Column::Id)
        .all(db)
        .await?
    {
        w.write_record([
            row.id.to_string(),
            row.medicine_id.map(|v| v.to_string()).unwrap_or_default(),
            row.location_id.map(|v| v.to_string()).unwrap_or_default(),
            row.operation_type.to_string(),
            row.operation_date.format(DATETIME_FORMAT).to_string(),
            row.quantity.to_string(),
            opt_datetime(row.created_date),
        ])
        .map_err(csv_error)?;
    }
    finish(w)
}

fn csv_error(e: csv::Error) -> ServiceError {
    ServiceError::InternalError(format!("CSV serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_trims_and_drops_empty() {
        let headers = StringRecord::from(vec!["companies_id", "gln", "name_short"]);
        let record = StringRecord::from(vec!["1", "  4600000000001  ", ""]);
        assert_eq!(
            field(&headers, &record, "gln"),
            Some("4600000000001".to_string())
        );
        assert_eq!(field(&headers, &record, "name_short"), None);
        assert_eq!(field(&headers, &record, "missing"), None);
    }

    #[test]
    fn booleans_accept_common_spellings() {
        for truthy in ["true", "True", "1", "yes"] {
            assert!(parse_bool(Some(truthy.to_string())), "{truthy}");
        }
        assert!(!parse_bool(Some("false".to_string())));
        assert!(!parse_bool(None));
    }

    #[test]
    fn datetime_parsing_accepts_bare_dates() {
        let parsed = parse_datetime(Some("2025-06-01".to_string()), "operation_date", 1)
            .expect("parse")
            .expect("value");
        assert_eq!(parsed.format(DATETIME_FORMAT).to_string(), "2025-06-01 00:00:00");

        assert!(parse_datetime(Some("junk".to_string()), "operation_date", 3).is_err());
    }
}
