use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Transaction};

use crate::{
    application::repos::{
        FilterOperator, FilterValue, PageSize, RepoError, SortDirection, TagQuery,
        TagsRepo, TagsTransaction,
    },
    domain::{entities::TagRecord, types::TagStatus},
};

use super::{PostgresRepositories, util::map_sqlx_error};

const TAG_COLUMNS: &str =
    "id, title, uri, css, description, status, icon_path, reference_count, random_double";

#[derive(sqlx::FromRow)]
struct TagRow {
    id: i64,
    title: String,
    uri: String,
    css: String,
    description: String,
    status: TagStatus,
    icon_path: String,
    reference_count: i64,
    random_double: f64,
}

impl From<TagRow> for TagRecord {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            uri: row.uri,
            css: row.css,
            description: row.description,
            status: row.status,
            icon_path: row.icon_path,
            reference_count: row.reference_count,
            random_double: row.random_double,
        }
    }
}

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn query_tags(&self, query: &TagQuery) -> Result<Vec<TagRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(TAG_COLUMNS);
        qb.push(" FROM tags t WHERE 1=1 ");

        Self::apply_tag_filters(&mut qb, query);

        if let Some(sort) = query.sort {
            qb.push(" ORDER BY t.");
            qb.push(sort.field.as_str());
            qb.push(match sort.direction {
                SortDirection::Ascending => " ASC",
                SortDirection::Descending => " DESC",
            });
        }

        if let PageSize::Limited(limit) = query.page_size {
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(limit));
        }

        let rows = qb
            .build_query_as::<TagRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TagRecord::from).collect())
    }

    async fn begin(&self) -> Result<Box<dyn TagsTransaction>, RepoError> {
        let tx = PostgresRepositories::begin(self)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Box::new(PostgresTagsTransaction { tx: Some(tx) }))
    }
}

impl PostgresRepositories {
    fn apply_tag_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &TagQuery) {
        for filter in &query.filters {
            qb.push(" AND t.");
            qb.push(filter.field.as_str());
            qb.push(match filter.operator {
                FilterOperator::Equal => " = ",
                FilterOperator::NotEqual => " <> ",
                FilterOperator::GreaterThan => " > ",
            });

            match &filter.value {
                FilterValue::Int(value) => qb.push_bind(*value),
                FilterValue::Float(value) => qb.push_bind(*value),
                FilterValue::Text(value) => qb.push_bind(value.clone()),
                FilterValue::Status(value) => qb.push_bind(*value),
            };
        }
    }
}

/// Tag updates inside one Postgres transaction.
///
/// Dropping it without commit rolls the transaction back.
pub struct PostgresTagsTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

#[async_trait]
impl TagsTransaction for PostgresTagsTransaction {
    async fn update_tag(&mut self, tag: &TagRecord) -> Result<(), RepoError> {
        let Some(tx) = self.tx.as_mut() else {
            return Err(RepoError::TransactionClosed);
        };

        let result = sqlx::query(
            r#"
            UPDATE tags
            SET title = $2,
                uri = $3,
                css = $4,
                description = $5,
                status = $6,
                icon_path = $7,
                reference_count = $8,
                random_double = $9
            WHERE id = $1
            "#,
        )
        .bind(tag.id)
        .bind(&tag.title)
        .bind(&tag.uri)
        .bind(&tag.css)
        .bind(&tag.description)
        .bind(tag.status)
        .bind(&tag.icon_path)
        .bind(tag.reference_count)
        .bind(tag.random_double)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), RepoError> {
        match self.tx.take() {
            Some(tx) => tx.commit().await.map_err(map_sqlx_error),
            None => Err(RepoError::TransactionClosed),
        }
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), RepoError> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(map_sqlx_error),
            None => Err(RepoError::TransactionClosed),
        }
    }

    fn is_active(&self) -> bool {
        self.tx.is_some()
    }
}
