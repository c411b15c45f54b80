// ==========================================
// Patient Registry - import configuration reader
// ==========================================
// Read-only view of the settings the importer needs.
// Implementor: ConfigManager (config_kv table)
// ==========================================

use crate::domain::types::KindSelector;
use crate::repository::error::RepositoryResult;

pub trait ImportConfigReader: Send + Sync {
    /// Prefix of the generated unique identifier
    ///
    /// # Default
    /// - "PSB_Un"
    fn get_unique_id_prefix(&self) -> RepositoryResult<String>;

    /// Kind selector used when the caller does not pass one
    ///
    /// # Default
    /// - auto
    fn get_default_record_kind(&self) -> RepositoryResult<KindSelector>;

    /// Whether differing values become conflicts (true) or overwrite (false)
    ///
    /// # Default
    /// - true
    fn get_create_conflicts(&self) -> RepositoryResult<bool>;

    /// Identity recorded when the caller does not name an operator
    ///
    /// # Default
    /// - "system"
    fn get_default_operator(&self) -> RepositoryResult<String>;
}

impl<T> ImportConfigReader for std::sync::Arc<T>
where
    T: ImportConfigReader + ?Sized,
{
    fn get_unique_id_prefix(&self) -> RepositoryResult<String> {
        (**self).get_unique_id_prefix()
    }

    fn get_default_record_kind(&self) -> RepositoryResult<KindSelector> {
        (**self).get_default_record_kind()
    }

    fn get_create_conflicts(&self) -> RepositoryResult<bool> {
        (**self).get_create_conflicts()
    }

    fn get_default_operator(&self) -> RepositoryResult<String> {
        (**self).get_default_operator()
    }
}
