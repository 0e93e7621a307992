use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::models::company::{BranchStatus, ResultRecord};

/// Point lookup of the stored result for one registry number.
pub async fn get_result(
    pool: &SqlitePool,
    registry_number: &str,
) -> Result<Option<ResultRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT kvk_number, company_name, has_branches, attempt_count, last_attempt_at
        FROM companies
        WHERE kvk_number = ?1
        "#,
    )
    .bind(registry_number)
    .fetch_optional(pool)
    .await?;

    row.map(record_from_row).transpose()
}

/// Insert or update the result for one registry number.
///
/// The only write path of the store: increments attempt_count and stamps
/// last_attempt_at on every call. The conflict guard keeps resolved records
/// monotonic — a failed sentinel never overwrites a definitive result.
pub async fn upsert_result(
    pool: &SqlitePool,
    registry_number: &str,
    name: &str,
    has_branches: BranchStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO companies (kvk_number, company_name, has_branches, attempt_count, last_attempt_at)
        VALUES (?1, ?2, ?3, 1, ?4)
        ON CONFLICT(kvk_number) DO UPDATE SET
            company_name = excluded.company_name,
            has_branches = excluded.has_branches,
            attempt_count = companies.attempt_count + 1,
            last_attempt_at = excluded.last_attempt_at
        WHERE excluded.has_branches != -1 OR companies.has_branches = -1
        "#,
    )
    .bind(registry_number)
    .bind(name)
    .bind(has_branches.to_sentinel())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// All records currently holding the failed sentinel, oldest attempt first.
/// Drives `--retry-failed` iteration.
pub async fn list_failed(pool: &SqlitePool) -> Result<Vec<ResultRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT kvk_number, company_name, has_branches, attempt_count, last_attempt_at
        FROM companies
        WHERE has_branches = -1
        ORDER BY last_attempt_at ASC, kvk_number ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(record_from_row).collect()
}

/// True iff a definitive (non-failed) result exists for this registry
/// number. The orchestrator's skip check on resumed runs.
pub async fn exists_resolved(
    pool: &SqlitePool,
    registry_number: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT 1 FROM companies
        WHERE kvk_number = ?1 AND has_branches IN (0, 1)
        "#,
    )
    .bind(registry_number)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

fn record_from_row(row: sqlx::sqlite::SqliteRow) -> Result<ResultRecord, sqlx::Error> {
    let sentinel: i64 = row.try_get("has_branches")?;
    let last_attempt_at: DateTime<Utc> = row.try_get("last_attempt_at")?;

    Ok(ResultRecord {
        registry_number: row.try_get("kvk_number")?,
        name: row.try_get("company_name")?,
        has_branches: BranchStatus::from_sentinel(sentinel),
        attempt_count: row.try_get("attempt_count")?,
        last_attempt_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        // A single connection keeps every statement on the same in-memory db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        crate::db::run_migrations(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let pool = test_pool().await;

        upsert_result(&pool, "12345678", "Acme BV", BranchStatus::HasBranches)
            .await
            .unwrap();

        let record = get_result(&pool, "12345678").await.unwrap().unwrap();
        assert_eq!(record.registry_number, "12345678");
        assert_eq!(record.name, "Acme BV");
        assert_eq!(record.has_branches, BranchStatus::HasBranches);
        assert_eq!(record.attempt_count, 1);
    }

    #[tokio::test]
    async fn test_get_absent() {
        let pool = test_pool().await;
        assert!(get_result(&pool, "00000001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attempt_count_increments() {
        let pool = test_pool().await;

        upsert_result(&pool, "12345678", "Acme BV", BranchStatus::Failed)
            .await
            .unwrap();
        upsert_result(&pool, "12345678", "Acme BV", BranchStatus::Failed)
            .await
            .unwrap();
        upsert_result(&pool, "12345678", "Acme BV", BranchStatus::NoBranches)
            .await
            .unwrap();

        let record = get_result(&pool, "12345678").await.unwrap().unwrap();
        assert_eq!(record.attempt_count, 3);
        assert_eq!(record.has_branches, BranchStatus::NoBranches);
    }

    #[tokio::test]
    async fn test_failed_never_overwrites_definitive() {
        let pool = test_pool().await;

        upsert_result(&pool, "12345678", "Acme BV", BranchStatus::HasBranches)
            .await
            .unwrap();
        upsert_result(&pool, "12345678", "Acme BV", BranchStatus::Failed)
            .await
            .unwrap();

        let record = get_result(&pool, "12345678").await.unwrap().unwrap();
        assert_eq!(record.has_branches, BranchStatus::HasBranches);
        assert_eq!(record.attempt_count, 1);
    }

    #[tokio::test]
    async fn test_definitive_overwrites_failed() {
        let pool = test_pool().await;

        upsert_result(&pool, "12345678", "Acme BV", BranchStatus::Failed)
            .await
            .unwrap();
        upsert_result(&pool, "12345678", "Acme BV", BranchStatus::NoBranches)
            .await
            .unwrap();

        let record = get_result(&pool, "12345678").await.unwrap().unwrap();
        assert_eq!(record.has_branches, BranchStatus::NoBranches);
    }

    #[tokio::test]
    async fn test_list_failed_only_returns_sentinel_records() {
        let pool = test_pool().await;

        upsert_result(&pool, "00000001", "A", BranchStatus::HasBranches)
            .await
            .unwrap();
        upsert_result(&pool, "00000002", "B", BranchStatus::Failed)
            .await
            .unwrap();
        upsert_result(&pool, "00000003", "C", BranchStatus::NoBranches)
            .await
            .unwrap();
        upsert_result(&pool, "00000004", "D", BranchStatus::Failed)
            .await
            .unwrap();

        let failed = list_failed(&pool).await.unwrap();
        let numbers: Vec<&str> = failed.iter().map(|r| r.registry_number.as_str()).collect();
        assert_eq!(numbers, vec!["00000002", "00000004"]);
    }

    #[tokio::test]
    async fn test_exists_resolved() {
        let pool = test_pool().await;

        upsert_result(&pool, "00000001", "A", BranchStatus::HasBranches)
            .await
            .unwrap();
        upsert_result(&pool, "00000002", "B", BranchStatus::Failed)
            .await
            .unwrap();

        assert!(exists_resolved(&pool, "00000001").await.unwrap());
        assert!(!exists_resolved(&pool, "00000002").await.unwrap());
        assert!(!exists_resolved(&pool, "00000003").await.unwrap());
    }
}
