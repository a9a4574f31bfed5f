use ombruk_db::db::store::OccurrenceFilter;
use ombruk_db::error::DbError;
use ombruk_recurrence::RuleError;
use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidRule(RuleError),

    #[error(transparent)]
    InvalidTemplate(RuleError),

    #[error("Nothing to delete for {0:?}")]
    EmptyDeleteTarget(OccurrenceFilter),

    #[error("Persistence failure while {context}: {source}")]
    PersistenceFailure {
        context: String,
        #[source]
        source: DbError,
    },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<RuleError> for ServiceError {
    fn from(error: RuleError) -> Self {
        if error.is_template_error() {
            Self::InvalidTemplate(error)
        } else {
            Self::InvalidRule(error)
        }
    }
}

impl ServiceError {
    /// ## Summary
    /// Wraps a store error with a description of what was being done.
    ///
    /// Meant for `map_err`: `.map_err(ServiceError::persistence("loading rule"))`.
    #[must_use]
    pub fn persistence(context: impl Into<String>) -> impl FnOnce(DbError) -> Self {
        let context = context.into();
        move |source| Self::PersistenceFailure { context, source }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
