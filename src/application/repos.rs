//! Repository traits describing persistence adapters.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::TagRecord;
use crate::domain::types::TagStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("transaction is no longer active")]
    TransactionClosed,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Queryable tag properties. Adapters map these onto their own column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Id,
    Title,
    Uri,
    Status,
    IconPath,
    ReferenceCount,
    RandomDouble,
}

impl TagField {
    pub fn as_str(self) -> &'static str {
        match self {
            TagField::Id => "id",
            TagField::Title => "title",
            TagField::Uri => "uri",
            TagField::Status => "status",
            TagField::IconPath => "icon_path",
            TagField::ReferenceCount => "reference_count",
            TagField::RandomDouble => "random_double",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Text(String),
    Status(TagStatus),
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<TagStatus> for FilterValue {
    fn from(value: TagStatus) -> Self {
        Self::Status(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    GreaterThan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub field: TagField,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl PropertyFilter {
    pub fn new(field: TagField, operator: FilterOperator, value: impl Into<FilterValue>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSort {
    pub field: TagField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Limited(u32),
    Unbounded,
}

/// Single-page tag query. Filters combine with AND.
#[derive(Debug, Clone, PartialEq)]
pub struct TagQuery {
    pub filters: Vec<PropertyFilter>,
    pub sort: Option<TagSort>,
    pub page_size: PageSize,
}

impl Default for TagQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: None,
            page_size: PageSize::Unbounded,
        }
    }
}

impl TagQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: PropertyFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, field: TagField, direction: SortDirection) -> Self {
        self.sort = Some(TagSort { field, direction });
        self
    }

    pub fn page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }
}

impl fmt::Display for TagQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filters=[")?;
        for (index, filter) in self.filters.iter().enumerate() {
            if index > 0 {
                write!(f, " AND ")?;
            }
            write!(
                f,
                "{} {:?} {:?}",
                filter.field.as_str(),
                filter.operator,
                filter.value
            )?;
        }
        write!(f, "]")?;
        if let Some(sort) = self.sort {
            write!(f, " sort={} {:?}", sort.field.as_str(), sort.direction)?;
        }
        match self.page_size {
            PageSize::Limited(limit) => write!(f, " limit={limit}"),
            PageSize::Unbounded => write!(f, " limit=unbounded"),
        }
    }
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn query_tags(&self, query: &TagQuery) -> Result<Vec<TagRecord>, RepoError>;

    async fn begin(&self) -> Result<Box<dyn TagsTransaction>, RepoError>;
}

/// All-or-nothing batch of tag updates.
///
/// Dropping an active transaction without committing discards its updates.
#[async_trait]
pub trait TagsTransaction: Send {
    async fn update_tag(&mut self, tag: &TagRecord) -> Result<(), RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;

    async fn rollback(self: Box<Self>) -> Result<(), RepoError>;

    fn is_active(&self) -> bool;
}
