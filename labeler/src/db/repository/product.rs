//! Product Repository

use super::{RepoError, RepoResult};
use shared::models::{Product, ProductInput, ProductSummary};
use sqlx::SqlitePool;
use validator::Validate;

/// Insert, or update every non-key field when the code already exists
pub async fn upsert(pool: &SqlitePool, input: &ProductInput) -> RepoResult<Product> {
    input.validate()?;
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (product_code, description, upc, sell_by, tare, label_format,
                               price_per_lb, min_wt, max_wt, logo_path, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(product_code) DO UPDATE SET
           description = excluded.description,
           upc = excluded.upc,
           sell_by = excluded.sell_by,
           tare = excluded.tare,
           label_format = excluded.label_format,
           price_per_lb = excluded.price_per_lb,
           min_wt = excluded.min_wt,
           max_wt = excluded.max_wt,
           logo_path = excluded.logo_path,
           updated_at = excluded.updated_at
         RETURNING *",
    )
    .bind(&input.product_code)
    .bind(&input.description)
    .bind(&input.upc)
    .bind(&input.sell_by)
    .bind(input.tare)
    .bind(&input.label_format)
    .bind(input.price_per_lb)
    .bind(input.min_wt)
    .bind(input.max_wt)
    .bind(&input.logo_path)
    .bind(shared::util::now_millis())
    .fetch_one(pool)
    .await?;
    Ok(product)
}

/// Insert a new product; fails with `Duplicate` if the code is taken
pub async fn create(pool: &SqlitePool, input: &ProductInput) -> RepoResult<Product> {
    input.validate()?;
    sqlx::query_as::<_, Product>(
        "INSERT INTO products (product_code, description, upc, sell_by, tare, label_format,
                               price_per_lb, min_wt, max_wt, logo_path, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         RETURNING *",
    )
    .bind(&input.product_code)
    .bind(&input.description)
    .bind(&input.upc)
    .bind(&input.sell_by)
    .bind(input.tare)
    .bind(&input.label_format)
    .bind(input.price_per_lb)
    .bind(input.min_wt)
    .bind(input.max_wt)
    .bind(&input.logo_path)
    .bind(shared::util::now_millis())
    .fetch_one(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("Product {} already exists", input.product_code))
        }
        other => other,
    })
}

/// Replace an existing product's fields (the code itself may change)
pub async fn update(pool: &SqlitePool, code: &str, input: &ProductInput) -> RepoResult<Product> {
    input.validate()?;
    sqlx::query_as::<_, Product>(
        "UPDATE products SET
           product_code = ?1, description = ?2, upc = ?3, sell_by = ?4, tare = ?5,
           label_format = ?6, price_per_lb = ?7, min_wt = ?8, max_wt = ?9, logo_path = ?10,
           updated_at = ?11
         WHERE product_code = ?12
         RETURNING *",
    )
    .bind(&input.product_code)
    .bind(&input.description)
    .bind(&input.upc)
    .bind(&input.sell_by)
    .bind(input.tare)
    .bind(&input.label_format)
    .bind(input.price_per_lb)
    .bind(input.min_wt)
    .bind(input.max_wt)
    .bind(&input.logo_path)
    .bind(shared::util::now_millis())
    .bind(code)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| RepoError::NotFound(format!("Product {code}")))
}

pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE product_code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(product)
}

/// Code, description and price per pound, ordered by code
pub async fn list(pool: &SqlitePool) -> RepoResult<Vec<ProductSummary>> {
    let rows = sqlx::query_as::<_, ProductSummary>(
        "SELECT product_code, description, price_per_lb FROM products ORDER BY product_code",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns whether a row was removed
pub async fn delete(pool: &SqlitePool, code: &str) -> RepoResult<bool> {
    let result = sqlx::query("DELETE FROM products WHERE product_code = ?")
        .bind(code)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    fn turkey() -> ProductInput {
        let mut input = ProductInput::new("T100");
        input.description = Some("Whole Turkey".into());
        input.upc = Some("01234567890".into());
        input.tare = 0.5;
        input.price_per_lb = 1.99;
        input
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let db = DbService::in_memory().await.unwrap();
        let first = upsert(&db.pool, &turkey()).await.unwrap();
        assert_eq!(first.price_per_lb, 1.99);

        let mut changed = turkey();
        changed.price_per_lb = 2.49;
        changed.description = None;
        let second = upsert(&db.pool, &changed).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.price_per_lb, 2.49);
        assert_eq!(second.description, None);
        assert_eq!(list(&db.pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let db = DbService::in_memory().await.unwrap();
        create(&db.pool, &turkey()).await.unwrap();
        let err = create(&db.pool, &turkey()).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = DbService::in_memory().await.unwrap();
        let err = update(&db.pool, "NOPE", &turkey()).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_can_rename() {
        let db = DbService::in_memory().await.unwrap();
        create(&db.pool, &turkey()).await.unwrap();
        let mut renamed = turkey();
        renamed.product_code = "T200".into();
        update(&db.pool, "T100", &renamed).await.unwrap();
        assert!(find_by_code(&db.pool, "T100").await.unwrap().is_none());
        assert!(find_by_code(&db.pool, "T200").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let db = DbService::in_memory().await.unwrap();
        let mut bad = turkey();
        bad.price_per_lb = -1.0;
        assert!(matches!(
            upsert(&db.pool, &bad).await.unwrap_err(),
            RepoError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_list_is_ordered_and_delete_reports() {
        let db = DbService::in_memory().await.unwrap();
        for code in ["C3", "A1", "B2"] {
            upsert(&db.pool, &ProductInput::new(code)).await.unwrap();
        }
        let codes: Vec<_> = list(&db.pool)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.product_code)
            .collect();
        assert_eq!(codes, ["A1", "B2", "C3"]);

        assert!(delete(&db.pool, "B2").await.unwrap());
        assert!(!delete(&db.pool, "B2").await.unwrap());
    }

    #[tokio::test]
    async fn test_defaults_round_trip() {
        let db = DbService::in_memory().await.unwrap();
        let p = upsert(&db.pool, &ProductInput::new("X1")).await.unwrap();
        assert_eq!(p.tare, 0.0);
        assert_eq!(p.max_wt, shared::models::DEFAULT_MAX_WT);
        assert_eq!(p.upc, None);
        assert!(p.updated_at > 0);
    }
}
