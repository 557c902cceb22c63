//! Form 220 – record model, year-keyed template registry, and the renderer
//! that turns a batch of records into the finished certificate PDF.
//!
//! The pipeline mirrors the passthrough renderer's `bytes-or-error` contract:
//! records → page descriptors ([`crate::grid`]) → frozen layout → PDF bytes
//! ([`crate::render`]), one page per record, in input order.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::grid::{self, DocumentSpec, PageSpec, SheetConfig};
use crate::metrics::GenerationReport;
use crate::render::{self, RenderError};

mod year2022;

pub use year2022::Year2022;

/// One certificate: employer, employee, certification period, and the sparse
/// map of line-item amounts keyed by the form's box codes ("36".."55").
///
/// The upstream payroll system emits the employer/employee fields in
/// PascalCase; the serde renames keep that wire format intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormRecord {
    pub year: u16,
    pub sequence: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub begins_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ends_at: OffsetDateTime,

    // Employer (withholding agent)
    #[serde(rename = "Nit")]
    pub nit: String,
    #[serde(rename = "Dv")]
    pub dv: String,
    #[serde(rename = "BusinessName")]
    pub business_name: String,
    #[serde(rename = "DepartmentCode")]
    pub department_code: String,
    #[serde(rename = "MunicipalityCode")]
    pub municipality_code: String,
    #[serde(rename = "Place")]
    pub place: String,

    // Employee
    #[serde(rename = "IdentificationTypeCode")]
    pub identification_type_code: u32,
    #[serde(rename = "IdentificationNumber")]
    pub identification_number: String,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "MiddleName", default)]
    pub middle_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "Surname", default)]
    pub surname: String,

    /// Sparse line-item amounts; boxes the payroll system did not aggregate
    /// are simply absent.
    #[serde(rename = "RowsMap", default)]
    pub rows_map: HashMap<String, f64>,
}

impl FormRecord {
    /// Amount for a line-item box. Absent codes are zero by design, never an
    /// error — the certificate prints `0` for them.
    pub fn amount(&self, code: &str) -> f64 {
        self.rows_map.get(code).copied().unwrap_or(0.0)
    }
}

/// A year-specific strategy that lays one record onto one page.
pub trait FormTemplate: Send + Sync {
    /// Page geometry shared by every page this template produces.
    fn sheet(&self) -> SheetConfig;

    /// Build the page for one record.
    fn build_page(&self, record: &FormRecord) -> PageSpec;
}

/// Year → template table. Supporting a new tax year is inserting an entry
/// here, not editing a dispatch function.
pub struct TemplateRegistry {
    templates: HashMap<u16, Box<dyn FormTemplate>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Registry with every template this crate ships.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(2022, Box::new(Year2022));
        registry
    }

    pub fn register(&mut self, year: u16, template: Box<dyn FormTemplate>) {
        self.templates.insert(year, template);
    }

    pub fn get(&self, year: u16) -> Option<&dyn FormTemplate> {
        self.templates.get(&year).map(|t| &**t)
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[derive(Debug, Error)]
pub enum FormError {
    /// Empty batch; the boundary maps this to a client error.
    #[error("no records to generate")]
    Empty,
    /// No template registered for the batch's year; also a client error.
    #[error("year {0} not supported")]
    UnsupportedYear(u16),
    /// The serializer failed (asset problems and the like); internal.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Renders record batches to PDF bytes.
pub struct FormRenderer {
    registry: TemplateRegistry,
    assets_dir: PathBuf,
    reports_dir: PathBuf,
}

impl FormRenderer {
    pub fn new(assets_dir: impl Into<PathBuf>, reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry: TemplateRegistry::with_builtin(),
            assets_dir: assets_dir.into(),
            reports_dir: reports_dir.into(),
        }
    }

    pub fn with_registry(mut self, registry: TemplateRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Render one page per record, in input order.
    ///
    /// The template is chosen from the FIRST record's year and applied to the
    /// whole batch; later records declaring a different year are not rejected
    /// and render with the first record's template. Callers that can receive
    /// mixed-year batches should validate before calling.
    ///
    /// With `debug` set, a generation report is written to the reports
    /// directory after a successful render; a failed write is logged and
    /// swallowed, it never affects the returned bytes.
    pub fn render(&self, records: &[FormRecord], debug: bool) -> Result<Vec<u8>, FormError> {
        let first = records.first().ok_or(FormError::Empty)?;
        let template = self
            .registry
            .get(first.year)
            .ok_or(FormError::UnsupportedYear(first.year))?;

        let build_started = Instant::now();
        let mut doc = DocumentSpec {
            sheet: template.sheet(),
            pages: Vec::with_capacity(records.len()),
        };
        for record in records {
            doc.pages.push(template.build_page(record));
        }
        let build = build_started.elapsed();

        let layout_started = Instant::now();
        let sheet = grid::layout(&doc);
        let layout = layout_started.elapsed();

        let serialize_started = Instant::now();
        let bytes = render::render_pdf(&sheet, &self.assets_dir)?;
        let serialize = serialize_started.elapsed();

        if debug {
            let report = GenerationReport {
                pages: sheet.pages.len(),
                cells: sheet.pages.iter().map(|p| p.cells.len()).sum(),
                build,
                layout,
                serialize,
                output_bytes: bytes.len(),
            };
            match report.save(&self.reports_dir) {
                Ok(path) => log::info!("generation report saved to {}", path.display()),
                Err(err) => log::warn!("could not save generation report: {err}"),
            }
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(year: u16) -> FormRecord {
        FormRecord {
            year,
            sequence: 7,
            begins_at: datetime!(2022-01-01 00:00:00 UTC),
            ends_at: datetime!(2022-12-31 00:00:00 UTC),
            nit: "900123456".to_string(),
            dv: "7".to_string(),
            business_name: "Acme de Colombia SAS".to_string(),
            department_code: "11".to_string(),
            municipality_code: "001".to_string(),
            place: "Bogotá D.C.".to_string(),
            identification_type_code: 13,
            identification_number: "1020304050".to_string(),
            first_name: "María".to_string(),
            middle_name: String::new(),
            last_name: "Pérez".to_string(),
            surname: "Gómez".to_string(),
            rows_map: HashMap::from([("36".to_string(), 48_000_000.0)]),
        }
    }

    #[test]
    fn absent_line_items_read_as_zero() {
        let r = record(2022);
        assert_eq!(r.amount("36"), 48_000_000.0);
        assert_eq!(r.amount("55"), 0.0);
    }

    #[test]
    fn builtin_registry_knows_2022_only() {
        let registry = TemplateRegistry::with_builtin();
        assert!(registry.get(2022).is_some());
        assert!(registry.get(1999).is_none());
        assert!(registry.get(2023).is_none());
    }

    #[test]
    fn registering_a_year_is_additive() {
        let mut registry = TemplateRegistry::with_builtin();
        registry.register(2023, Box::new(Year2022));
        assert!(registry.get(2022).is_some());
        assert!(registry.get(2023).is_some());
    }

    #[test]
    fn record_json_uses_the_upstream_field_casing() {
        let json = serde_json::to_value(record(2022)).expect("serialize");
        assert!(json.get("Nit").is_some());
        assert!(json.get("BusinessName").is_some());
        assert!(json.get("RowsMap").is_some());
        assert!(json.get("year").is_some());
        assert!(json.get("begins_at").is_some());
    }

    #[test]
    fn empty_batch_is_a_typed_error() {
        let renderer = FormRenderer::new("assets", ".");
        match renderer.render(&[], false) {
            Err(FormError::Empty) => {}
            other => panic!("expected Empty, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_year_is_a_typed_error() {
        let renderer = FormRenderer::new("assets", ".");
        match renderer.render(&[record(1999)], false) {
            Err(FormError::UnsupportedYear(1999)) => {}
            other => panic!("expected UnsupportedYear, got {other:?}"),
        }
    }
}
