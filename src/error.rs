//! Error catalog and the three-tag operation result
use crate::value::Value;

/// Symbolic error codes carried on every non-success result. The
/// `#[error(...)]` string is the human-readable catalog description.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    #[error("The request payload is empty")]
    PayloadEmpty,
    #[error("Required account keys are missing from the request")]
    AccountKeysMissing,
    #[error("Required role keys are missing from the request")]
    RoleKeysMissing,
    #[error("Required manager keys are missing from the request")]
    ManagerKeysMissing,
    #[error("The declared account type does not match the requested account type")]
    AccountTypeMismatch,
    #[error("An account already exists for the given type and identifier")]
    AccountExists,
    #[error("No account exists for the given type and identifier")]
    AccountNotExists,
    #[error("A role already exists for the given type and name")]
    RoleExists,
    #[error("No role exists for the given type and name")]
    RoleNotExists,
    #[error("The requested roles contain at least one invalid role")]
    RolesContainsInvalid,
    #[error("The account does not hold the requested role")]
    AccountRoleNotExists,
    #[error("The account has no roles assigned")]
    AccountNoRolesExist,
    #[error("No state has been set on the account by this manager")]
    AccountStateUnsetByManager,
    #[error("No review has been set on the account by this manager")]
    AccountReviewUnsetByManager,
    #[error("No identities were found in the accounts collection")]
    IdentitiesNoneFound,
    #[error("The account could not be created")]
    AccountCreateError,
    #[error("The account could not be updated")]
    AccountUpdateError,
    #[error("The role could not be created")]
    RoleCreateError,
    // The four symbols below are referenced by the mutation paths but have
    // no entry in the message catalog; they all resolve to the same
    // generic fallback description.
    #[error("An unexpected error occurred")]
    RoleUpdateError,
    #[error("An unexpected error occurred")]
    AccountDeleteError,
    #[error("An unexpected error occurred")]
    RoleDeleteError,
    #[error("An unexpected error occurred")]
    AuditlogEntryError,
}

impl ErrorCode {
    /// The symbolic name as it appears in the error catalog.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::PayloadEmpty => "PAYLOAD_EMPTY",
            Self::AccountKeysMissing => "ACCOUNT_KEYS_MISSING",
            Self::RoleKeysMissing => "ROLE_KEYS_MISSING",
            Self::ManagerKeysMissing => "MANAGER_KEYS_MISSING",
            Self::AccountTypeMismatch => "ACCOUNT_TYPE_MISMATCH",
            Self::AccountExists => "ACCOUNT_EXISTS",
            Self::AccountNotExists => "ACCOUNT_NOT_EXISTS",
            Self::RoleExists => "ROLE_EXISTS",
            Self::RoleNotExists => "ROLE_NOT_EXISTS",
            Self::RolesContainsInvalid => "ROLES_CONTAINS_INVALID",
            Self::AccountRoleNotExists => "ACCOUNT_ROLE_NOT_EXISTS",
            Self::AccountNoRolesExist => "ACCOUNT_NO_ROLES_EXIST",
            Self::AccountStateUnsetByManager => "ACCOUNT_STATE_UNSET_BY_MANAGER",
            Self::AccountReviewUnsetByManager => "ACCOUNT_REVIEW_UNSET_BY_MANAGER",
            Self::IdentitiesNoneFound => "IDENTITIES_NONE_FOUND",
            Self::AccountCreateError => "ACCOUNT_CREATE_ERROR",
            Self::AccountUpdateError => "ACCOUNT_UPDATE_ERROR",
            Self::RoleCreateError => "ROLE_CREATE_ERROR",
            Self::RoleUpdateError => "ROLE_UPDATE_ERROR",
            Self::AccountDeleteError => "ACCOUNT_DELETE_ERROR",
            Self::RoleDeleteError => "ROLE_DELETE_ERROR",
            Self::AuditlogEntryError => "AUDITLOG_ENTRY_ERROR",
        }
    }
}

/// Every operation resolves to exactly one of these three tags. `Fail` is
/// caller-correctable, `Error` is a storage-layer write that reported
/// failure. Collaborator transport faults travel on the outer
/// `anyhow::Result` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Fail {
        code: ErrorCode,
        required_keys: Vec<String>,
    },
    Error {
        code: ErrorCode,
    },
}

impl Outcome {
    pub fn success(payload: impl Into<Value>) -> Self {
        Self::Success(payload.into())
    }
    pub fn fail(code: ErrorCode) -> Self {
        Self::Fail {
            code,
            required_keys: Vec::new(),
        }
    }
    pub fn fail_with_keys(code: ErrorCode, required_keys: Vec<String>) -> Self {
        Self::Fail {
            code,
            required_keys,
        }
    }
    pub fn error(code: ErrorCode) -> Self {
        Self::Error { code }
    }
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Success(_) => None,
            Self::Fail { code, .. } | Self::Error { code } => Some(*code),
        }
    }
    /// Catalog description for fail/error results.
    pub fn description(&self) -> Option<String> {
        self.code().map(|code| code.to_string())
    }
}
