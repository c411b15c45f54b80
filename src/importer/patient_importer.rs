// ==========================================
// Patient Registry - import orchestrator
// ==========================================
// Flow: parse -> detect kind -> (map -> merge -> tally) per row -> batch row
// Rows run in order, each in its own transaction; later rows see the
// writes of earlier ones. Only structural problems abort the import.
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import::{ImportBatch, ImportReport, ImportSummary};
use crate::domain::types::{KindSelector, RecordKind};
use crate::importer::cell::Sheet;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::ColumnMapper;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::merge_engine::MergeEngine;
use crate::importer::patient_importer_trait::{FieldMapper, FileParser};
use crate::importer::schema_detector::detect_record_kind;
use crate::repository::import_batch_repo::ImportBatchRepository;
use crate::repository::patient_store::PatientStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Parse a kind selector label (`amostras`, `bioinformatica`,
/// `dados_clinicos`, `auto`)
pub fn parse_kind_selector(raw: &str) -> ImportResult<KindSelector> {
    raw.parse::<KindSelector>()
        .map_err(ImportError::UnknownRecordKind)
}

// ==========================================
// PatientImporter
// ==========================================
pub struct PatientImporter<C>
where
    C: ImportConfigReader,
{
    // data access
    store: Arc<dyn PatientStore>,
    batch_repo: Arc<ImportBatchRepository>,

    // configuration
    config: C,

    // pipeline stages
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
}

impl<C> PatientImporter<C>
where
    C: ImportConfigReader,
{
    /// Importer with the default reader and column mapper
    pub fn new(store: Arc<dyn PatientStore>, batch_repo: Arc<ImportBatchRepository>, config: C) -> Self {
        Self::with_components(
            store,
            batch_repo,
            config,
            Box::new(UniversalFileParser),
            Box::new(ColumnMapper),
        )
    }

    pub fn with_components(
        store: Arc<dyn PatientStore>,
        batch_repo: Arc<ImportBatchRepository>,
        config: C,
        file_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
    ) -> Self {
        Self {
            store,
            batch_repo,
            config,
            file_parser,
            field_mapper,
        }
    }

    /// Resolve the record kind for a sheet
    fn resolve_kind(&self, sheet: &Sheet, selector: KindSelector) -> RecordKind {
        match selector {
            KindSelector::Explicit(kind) => kind,
            KindSelector::Auto => {
                let (kind, scores) = detect_record_kind(&sheet.columns);
                info!(
                    kind = %kind,
                    samples = scores.samples,
                    bioinformatics = scores.bioinformatics,
                    clinical = scores.clinical,
                    "record kind detected"
                );
                kind
            }
        }
    }

    /// Run every row of an already-parsed sheet through the engine.
    ///
    /// # Returns
    /// - Ok(ImportReport): counters, per-row detail, created conflicts
    /// - Err: configuration could not be read (no row processed)
    #[instrument(skip(self, sheet), fields(rows = sheet.len()))]
    pub fn import_sheet(
        &self,
        sheet: &Sheet,
        selector: KindSelector,
        create_conflicts: bool,
    ) -> ImportResult<ImportReport> {
        let kind = self.resolve_kind(sheet, selector);
        let engine = MergeEngine::new(Arc::clone(&self.store), self.config.get_unique_id_prefix()?);

        let mut report = ImportReport::new(kind);
        for row in &sheet.rows {
            let candidate = self.field_mapper.map_row(kind, &row.cells);
            let outcome = engine.process_row(&candidate, create_conflicts);
            debug!(row = row.row_number, status = %outcome.status(), "row processed");
            report.record_row(row.row_number, outcome);
        }

        info!(
            kind = %kind,
            total = report.total,
            new = report.new,
            updated = report.updated,
            conflicted = report.conflicted,
            errored = report.errored,
            conflicts = report.conflicts.len(),
            "sheet imported"
        );
        Ok(report)
    }

    /// Same as `import_sheet`, with the selector given as a label
    pub fn import_sheet_with_label(
        &self,
        sheet: &Sheet,
        selector: &str,
        create_conflicts: bool,
    ) -> ImportResult<ImportReport> {
        let selector = parse_kind_selector(selector)?;
        self.import_sheet(sheet, selector, create_conflicts)
    }

    /// Read a CSV/Excel file, import it and record an import batch.
    ///
    /// # Parameters
    /// - selector / create_conflicts / imported_by: None falls back to configuration
    #[instrument(skip(self, file_path), fields(batch_id))]
    pub fn import_file(
        &self,
        file_path: &Path,
        selector: Option<KindSelector>,
        create_conflicts: Option<bool>,
        imported_by: Option<&str>,
    ) -> ImportResult<ImportSummary> {
        let start = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let selector = match selector {
            Some(s) => s,
            None => self.config.get_default_record_kind()?,
        };
        let create_conflicts = match create_conflicts {
            Some(flag) => flag,
            None => self.config.get_create_conflicts()?,
        };
        let imported_by = match imported_by {
            Some(user) => user.to_string(),
            None => self.config.get_default_operator()?,
        };

        info!(file = %file_path.display(), selector = %selector, create_conflicts, "import started");

        let sheet = self.file_parser.parse_sheet(file_path).map_err(|e| {
            error!(error = %e, "sheet could not be read");
            e
        })?;
        if sheet.is_empty() {
            warn!("sheet has no data rows");
        }

        let report = self.import_sheet(&sheet, selector, create_conflicts)?;
        let elapsed_ms = start.elapsed().as_millis() as i64;

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        let batch = ImportBatch::from_report(
            batch_id,
            file_name,
            &report,
            create_conflicts,
            Some(imported_by),
            Some(elapsed_ms),
        );

        // bookkeeping only: row results are already committed
        if let Err(e) = self.batch_repo.insert_batch(&batch) {
            warn!(error = %e, "import batch could not be recorded");
        }

        info!(elapsed_ms = elapsed_ms, total = report.total, "import finished");
        Ok(ImportSummary { batch, report })
    }
}
