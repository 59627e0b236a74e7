use crate::validate::ValidationErrors;
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Problems with a record declaration, detected while the registry derives its schema.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("{record}: no field is annotated as id")]
    MissingId { record: String },

    #[error("{record}: fields `{first}` and `{second}` are both annotated as id")]
    DuplicateId { record: String, first: String, second: String },

    #[error("{record}.{field}: id must be an integer or String, found {found}")]
    UnsupportedIdType { record: String, field: String, found: String },

    #[error("{record}.{field}: invalid wire name `{name}`")]
    InvalidWireName { record: String, field: String, name: String },

    #[error("{record}: wire name `{name}` is declared by both `{first}` and `{second}`")]
    DuplicateWireName { record: String, name: String, first: String, second: String },

    #[error("{record}: invalid {what} identifier `{value}`")]
    InvalidIdentifier { record: String, what: &'static str, value: String },

    #[error("{record}: storage alias `{alias}` must differ from the table name")]
    AliasEqualsTable { record: String, alias: String },

    #[error("{record}: storage column `{column}` is used by both `{first}` and `{second}`")]
    DuplicateColumn { record: String, column: String, first: String, second: String },

    #[error("{record}: at most one expiring field is allowed, found `{first}` and `{second}`")]
    MultipleExpiring { record: String, first: String, second: String },

    #[error("{record}.{field}: option `{option}` is not allowed on {role} fields")]
    OptionNotAllowed { record: String, field: String, option: String, role: &'static str },

    #[error("{record}.{field}: malformed annotation: {reason}")]
    InvalidAnnotation { record: String, field: String, reason: String },

    #[error("{record}.{field}: invalid default `{value}` for {primitive}")]
    InvalidDefault { record: String, field: String, value: String, primitive: &'static str },

    #[error("{record}.{field}: {role} field must reference a record type, found {found}")]
    NotARecord { record: String, field: String, role: &'static str, found: String },

    #[error("{record}.{field}: {found} is not a supported attribute type")]
    UnsupportedAttributeType { record: String, field: String, found: String },

    #[error("{record}.{field}: {role} field must be a DateTime<Utc>, found {found}")]
    NotATimestamp { record: String, field: String, role: &'static str, found: String },

    #[error("{record}.{field}: has-one relation must be declared as Option<Box<_>>")]
    RequiredHasOne { record: String, field: String },

    #[error("{record}.{field}: belongs-to relation cannot be a collection")]
    CollectionBelongsTo { record: String, field: String },

    #[error("{record}.{field}: expected `{target}.{foreign_key}` to be a belongs-to field referencing {record}")]
    MissingInverse { record: String, field: String, target: String, foreign_key: String },

    #[error("{record}.{field}: many-to-many relations are not implemented")]
    ManyToMany { record: String, field: String },

    #[error("wire type `{wire_type}` is declared by both {first} and {second}")]
    DuplicateWireType { wire_type: String, first: String, second: String },
}

/// Failures while moving values between shapes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConversionError {
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    #[error("{record}.{field}: relation must not be null")]
    NullRelation { record: String, field: String },

    #[error("{record}.{field}: expected {expected}, found {found}")]
    InvalidValue { record: String, field: String, expected: &'static str, found: String },

    #[error("{shape} has no member `{member}`")]
    MissingMember { shape: String, member: String },

    #[error("malformed wire payload: {0}")]
    Wire(String),
}

/// User-facing problems with filter, sort, fieldset or page modifiers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("{record} has no field `{field}`")]
    UnknownField { record: String, field: String },

    #[error("`{field}` is a relation and cannot be used to {action}")]
    RelationNotAllowed { field: String, action: &'static str },

    #[error("`{field}` is not filterable")]
    NotFilterable { field: String },

    #[error("`{field}` is not sortable")]
    NotSortable { field: String },

    #[error("unknown filter operator `{0}`")]
    UnknownOperator(String),

    #[error("invalid value `{value}` for `{field}`, expected {expected}")]
    InvalidValue { field: String, value: String, expected: &'static str },

    #[error("unknown query parameter `{0}`")]
    UnknownParameter(String),

    #[error("unknown page parameter `{0}`")]
    UnknownPageParameter(String),

    #[error("page parameter `{param}` must be a non-negative integer, found `{value}`")]
    NotAnInteger { param: String, value: String },

    #[error("page size {requested} exceeds the maximum of {max}")]
    PageSizeExceeded { requested: u64, max: u64 },

    #[error("page size must be greater than zero")]
    EmptyPage,

    #[error("invalid cursor `{0}`")]
    InvalidCursor(String),

    #[error("offset (`page[number]`) and cursor (`page[after]`) pagination cannot be combined")]
    ConflictingPagination,

    #[error("unknown resource type `{0}`")]
    UnknownType(String),

    #[error("malformed query parameter `{0}`")]
    Malformed(String),
}

/// Errors reported by a storage backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("unique constraint violated on {table}.{column}")]
    UniqueViolation { table: String, column: String },

    #[error("{table}: no row with id {id}")]
    NotFound { table: String, id: String },

    #[error("unknown table `{0}`")]
    UnknownTable(String),

    #[error("storage backend: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AppError {

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Bad Request: {0}")]
    Query(#[from] QueryError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Conflict: `{field}` (column {column}) must be unique")]
    UniqueViolation { field: String, column: String },

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serde error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Query(_)                           => StatusCode::BAD_REQUEST,
            AppError::Conversion(ConversionError::Wire(_)) => StatusCode::BAD_REQUEST,
            AppError::SerdeError(_)                      => StatusCode::BAD_REQUEST,
            AppError::Validation(_)                      => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UniqueViolation { .. }             => StatusCode::CONFLICT,
            AppError::NotFound(_)                        => StatusCode::NOT_FOUND,
            _                                            => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let status = self.status_code();
        ErrorResponse { message: self.to_string(), code: status.as_u16() }
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { table, id } => AppError::NotFound(format!("{table}/{id}")),
            other => AppError::Storage(other),
        }
    }
}

/// Body handed to the request layer when a call fails.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: u16,
}
