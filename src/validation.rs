//! Per-entity field validators.
//!
//! Pure functions returning the full ordered list of human-readable errors
//! for a submission; an empty list means the fields are acceptable for
//! persistence. Rules are per-field independent and never consult the store.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::services::companies::CompanyInput;
use crate::services::locations::LocationInput;
use crate::services::medicines::MedicineInput;
use crate::services::operations::OperationInput;

/// 1-2 uppercase letters, 2 digits, 0-2 uppercase letters, 0-2 digits.
static ATC_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{1,2}[0-9]{2}[A-Z]{0,2}[0-9]{0,2}$").expect("valid regex"));

fn over(value: &Option<String>, limit: usize) -> bool {
    value.as_deref().map_or(false, |v| v.chars().count() > limit)
}

pub fn validate_medicine(input: &MedicineInput) -> Vec<String> {
    let mut errors = Vec::new();
    if input.name.is_empty() {
        errors.push("Name must not be empty".to_string());
    }
    if input.gtin.is_empty() || input.gtin.chars().count() > 20 {
        errors.push("GTIN must be non-empty and at most 20 characters".to_string());
    }
    if input.sku.is_empty() || input.sku.chars().count() > 20 {
        errors.push("SKU must be non-empty and at most 20 characters".to_string());
    }
    if input.market.is_empty() {
        errors.push("Market must not be empty".to_string());
    }
    if input.batch_number.is_empty() {
        errors.push("Batch number must not be empty".to_string());
    }
    if input.expiration_date.is_none() {
        errors.push("Expiration date is required".to_string());
    }
    if input.dosage_form.is_empty() {
        errors.push("Dosage form is required".to_string());
    }
    if input.active_ingredient.is_empty() {
        errors.push("Active ingredient is required".to_string());
    }
    if input.package_size.is_empty() {
        errors.push("Package size is required".to_string());
    }
    if input.owned_by.is_none() {
        errors.push("Owning company is required".to_string());
    }
    if let Some(code) = input.atc_code.as_deref() {
        if !code.is_empty() && !ATC_CODE.is_match(code) {
            errors.push("ATC code has an invalid format (example: A10BA02)".to_string());
        }
    }
    errors
}

pub fn validate_company(input: &CompanyInput) -> Vec<String> {
    let mut errors = Vec::new();
    if input.name_short.is_empty() {
        errors.push("Short name must not be empty".to_string());
    }
    if input.name_short.chars().count() > 50 {
        errors.push("Short name must not exceed 50 characters".to_string());
    }
    if input.name_full.is_empty() {
        errors.push("Full name must not be empty".to_string());
    }
    if input.name_full.chars().count() > 100 {
        errors.push("Full name must not exceed 100 characters".to_string());
    }
    if over(&input.gln, 20) {
        errors.push("GLN must not exceed 20 characters".to_string());
    }
    if over(&input.registration_country, 50) {
        errors.push("Registration country must not exceed 50 characters".to_string());
    }
    if over(&input.address, 200) {
        errors.push("Address must not exceed 200 characters".to_string());
    }
    if over(&input.company_type, 50) {
        errors.push("Company type must not exceed 50 characters".to_string());
    }
    errors
}

pub fn validate_location(input: &LocationInput) -> Vec<String> {
    let mut errors = Vec::new();
    if input.address.is_empty() {
        errors.push("Address must not be empty".to_string());
    }
    if input.address.chars().count() > 200 {
        errors.push("Address must not exceed 200 characters".to_string());
    }
    if over(&input.gln, 20) {
        errors.push("GLN must not exceed 20 characters".to_string());
    }
    if over(&input.country, 50) {
        errors.push("Country must not exceed 50 characters".to_string());
    }
    if over(&input.role, 50) {
        errors.push("Role must not exceed 50 characters".to_string());
    }
    if over(&input.name_short, 50) {
        errors.push("Short name must not exceed 50 characters".to_string());
    }
    if over(&input.name_full, 100) {
        errors.push("Full name must not exceed 100 characters".to_string());
    }
    if input.owned_by.is_none() {
        errors.push("Owning company is required".to_string());
    }
    errors
}

pub fn validate_operation(input: &OperationInput) -> Vec<String> {
    let mut errors = Vec::new();
    if input.medicine_id.is_none() {
        errors.push("Medicine id is required".to_string());
    }
    if input.location_id.is_none() {
        errors.push("Location id is required".to_string());
    }
    if input.operation_type.is_none() {
        errors.push("Operation type is required".to_string());
    }
    if input.operation_date.is_none() {
        errors.push("Operation date is required".to_string());
    }
    if input.quantity <= 0 {
        errors.push("Quantity must be greater than zero".to_string());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::operation::OperationType;
    use chrono::NaiveDate;

    fn valid_medicine() -> MedicineInput {
        MedicineInput {
            name: "Metformin".to_string(),
            gtin: "04601234567890".to_string(),
            sku: "MET-500".to_string(),
            market: "EU".to_string(),
            batch_number: "B-2024-001".to_string(),
            expiration_date: NaiveDate::from_ymd_opt(2027, 3, 1),
            dosage_form: "tablet".to_string(),
            active_ingredient: "metformin hydrochloride".to_string(),
            package_size: "30".to_string(),
            owned_by: Some(1),
            atc_code: Some("A10BA02".to_string()),
        }
    }

    #[test]
    fn valid_medicine_has_no_errors() {
        assert!(validate_medicine(&valid_medicine()).is_empty());
    }

    #[test]
    fn each_missing_medicine_field_reports_its_own_error() {
        let cases: Vec<(Box<dyn Fn(&mut MedicineInput)>, &str)> = vec![
            (Box::new(|m| m.name.clear()), "Name must not be empty"),
            (
                Box::new(|m| m.gtin.clear()),
                "GTIN must be non-empty and at most 20 characters",
            ),
            (
                Box::new(|m| m.sku = "X".repeat(21)),
                "SKU must be non-empty and at most 20 characters",
            ),
            (Box::new(|m| m.market.clear()), "Market must not be empty"),
            (
                Box::new(|m| m.batch_number.clear()),
                "Batch number must not be empty",
            ),
            (
                Box::new(|m| m.expiration_date = None),
                "Expiration date is required",
            ),
            (
                Box::new(|m| m.dosage_form.clear()),
                "Dosage form is required",
            ),
            (
                Box::new(|m| m.active_ingredient.clear()),
                "Active ingredient is required",
            ),
            (
                Box::new(|m| m.package_size.clear()),
                "Package size is required",
            ),
            (Box::new(|m| m.owned_by = None), "Owning company is required"),
        ];

        for (mutate, expected) in cases {
            let mut input = valid_medicine();
            mutate(&mut input);
            let errors = validate_medicine(&input);
            assert_eq!(errors, vec![expected.to_string()]);
        }
    }

    #[test]
    fn atc_code_format() {
        let mut input = valid_medicine();
        for good in ["A10BA02", "N02", "C03CA", "AB12"] {
            input.atc_code = Some(good.to_string());
            assert!(
                validate_medicine(&input).is_empty(),
                "expected {good} to validate"
            );
        }
        for bad in ["10BA02", "A1", "a10ba02", "A10BA023X"] {
            input.atc_code = Some(bad.to_string());
            assert_eq!(
                validate_medicine(&input),
                vec!["ATC code has an invalid format (example: A10BA02)".to_string()],
                "expected {bad} to fail"
            );
        }
        // Absent or blank codes are acceptable.
        input.atc_code = None;
        assert!(validate_medicine(&input).is_empty());
        input.atc_code = Some(String::new());
        assert!(validate_medicine(&input).is_empty());
    }

    #[test]
    fn company_length_bounds() {
        let input = CompanyInput {
            gln: Some("1".repeat(21)),
            name_short: "Acme".to_string(),
            name_full: "Acme Pharmaceuticals GmbH".to_string(),
            gcp_compliant: true,
            registration_country: Some("Germany".to_string()),
            address: Some("Hauptstr. 1, Berlin".to_string()),
            company_type: Some("manufacturer".to_string()),
        };
        assert_eq!(
            validate_company(&input),
            vec!["GLN must not exceed 20 characters".to_string()]
        );

        let empty = CompanyInput {
            name_short: String::new(),
            name_full: String::new(),
            ..input
        };
        let errors = validate_company(&empty);
        assert!(errors.contains(&"Short name must not be empty".to_string()));
        assert!(errors.contains(&"Full name must not be empty".to_string()));
    }

    #[test]
    fn location_requires_address_and_owner() {
        let input = LocationInput {
            gln: None,
            country: Some("Poland".to_string()),
            address: String::new(),
            role: Some("warehouse".to_string()),
            name_short: Some("WAW-1".to_string()),
            name_full: None,
            owned_by: None,
        };
        let errors = validate_location(&input);
        assert_eq!(
            errors,
            vec![
                "Address must not be empty".to_string(),
                "Owning company is required".to_string(),
            ]
        );
    }

    #[test]
    fn operation_quantity_must_be_positive() {
        let mut input = OperationInput {
            medicine_id: Some(1),
            location_id: Some(1),
            operation_type: Some(OperationType::Supply),
            operation_date: NaiveDate::from_ymd_opt(2025, 6, 1)
                .map(|d| d.and_hms_opt(0, 0, 0).expect("valid time")),
            quantity: 10,
        };
        assert!(validate_operation(&input).is_empty());

        input.quantity = 0;
        assert_eq!(
            validate_operation(&input),
            vec!["Quantity must be greater than zero".to_string()]
        );
        input.quantity = -5;
        assert_eq!(
            validate_operation(&input),
            vec!["Quantity must be greater than zero".to_string()]
        );
    }
}
