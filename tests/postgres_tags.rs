mod common;

use std::sync::Arc;

use common::default_cache;
use sqlx::PgPool;
use tagcache::application::repos::{
    FilterOperator, PageSize, PropertyFilter, RepoError, SortDirection, TagField, TagQuery,
    TagsRepo,
};
use tagcache::domain::types::TagStatus;
use tagcache::infra::db::PostgresRepositories;

async fn seed(pool: &PgPool) {
    sqlx::query(
        r#"
        INSERT INTO tags (id, title, uri, css, description, status, icon_path, reference_count, random_double)
        VALUES
            (1, 'alpha', 'alpha', '', '', 'valid', '', 0, 0.5),
            (2, 'Beta', 'Beta', '', '**bold**', 'valid', 'x.png', 3, 0.2),
            (3, '  spaced', '  spaced', '', '', 'valid', '', 5, 0.7),
            (4, 'hello world', '', 'old', '', 'valid', '', 1, 0.9),
            (5, 'gone', 'gone', '', '', 'invalid', 'y.png', 2, 0.1)
        "#,
    )
    .execute(pool)
    .await
    .expect("seed tags");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn query_builder_honors_filters_sort_and_limit(pool: PgPool) {
    seed(&pool).await;
    let repo = PostgresRepositories::new(pool);

    let query = TagQuery::new()
        .filter(PropertyFilter::new(
            TagField::ReferenceCount,
            FilterOperator::GreaterThan,
            0_i64,
        ))
        .filter(PropertyFilter::new(
            TagField::Status,
            FilterOperator::Equal,
            TagStatus::Valid,
        ))
        .sort(TagField::Id, SortDirection::Descending)
        .page_size(PageSize::Limited(2));

    let ids: Vec<i64> = repo
        .query_tags(&query)
        .await
        .expect("query")
        .iter()
        .map(|tag| tag.id)
        .collect();
    assert_eq!(ids, vec![4, 3]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn updating_missing_tag_is_not_found(pool: PgPool) {
    seed(&pool).await;
    let repo = PostgresRepositories::new(pool);

    let mut tx = TagsRepo::begin(&repo).await.expect("begin");
    let mut ghost = repo
        .query_tags(&TagQuery::new())
        .await
        .expect("query")
        .remove(0);
    ghost.id = 999;

    let err = tx.update_tag(&ghost).await.expect_err("missing row");
    assert!(matches!(err, RepoError::NotFound));
    tx.rollback().await.expect("rollback");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cache_loads_from_postgres(pool: PgPool) {
    seed(&pool).await;
    let repo = Arc::new(PostgresRepositories::new(pool.clone()));
    let cache = default_cache(repo);

    let reports = cache.reload_all().await;
    assert!(reports.iter().all(|report| report.is_clean()));

    let titles: Vec<String> = cache.tags().iter().map(|t| t.title().to_string()).collect();
    assert_eq!(titles, vec!["alpha", "Beta"]);
    assert_eq!(
        cache.new_tags().iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![4, 3, 2]
    );

    let (uri, css): (String, String) = sqlx::query_as("SELECT uri, css FROM tags WHERE id = 4")
        .fetch_one(&pool)
        .await
        .expect("migrated row");
    assert_eq!(uri, "hello+world");
    assert!(css.is_empty());
}
