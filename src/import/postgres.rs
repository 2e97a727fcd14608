use async_trait::async_trait;
use log::{error, info};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashSet;
use std::time::Duration;

use super::{BeadRow, BeadTable, ImportError, InsertOutcome};

/// Postgres caps a statement at 65535 bind parameters; each row binds 11.
const ROWS_PER_STATEMENT: usize = 5_000;

pub async fn connect_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

#[derive(Debug, Clone)]
pub struct PgBeadTable {
    pool: PgPool,
}

impl PgBeadTable {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, ImportError> {
        let pool = connect_pool(database_url).await?;
        info!("Connected to database");
        Ok(Self::new(pool))
    }
}

async fn count_for_brand(
    tx: &mut Transaction<'_, Postgres>,
    brand_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM beads WHERE brand_id = $1")
        .bind(brand_id)
        .fetch_one(&mut **tx)
        .await
}

async fn insert_rows(
    tx: &mut Transaction<'_, Postgres>,
    brand_id: i64,
    rows: &[BeadRow],
) -> Result<InsertOutcome, sqlx::Error> {
    let count_before = count_for_brand(tx, brand_id).await?;
    info!("Found {} existing beads for brand {}", count_before, brand_id);

    let mut inserted = 0;
    for chunk in rows.chunks(ROWS_PER_STATEMENT) {
        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO beads (brand_product_code, name, brand_id, shape, size, \
             color_group, glass_group, finish, dyed, galvanized, plating, \
             created_at, updated_at) ",
        );
        query.push_values(chunk, |mut b, row| {
            b.push_bind(row.brand_product_code.clone())
                .push_bind(row.name.clone())
                .push_bind(brand_id)
                .push_bind(row.shape.clone())
                .push_bind(row.size.clone())
                .push_bind(row.color_group.clone())
                .push_bind(row.glass_group.clone())
                .push_bind(row.finish.clone())
                .push_bind(row.dyed.clone())
                .push_bind(row.galvanized.clone())
                .push_bind(row.plating.clone())
                .push("NOW()")
                .push("NOW()");
        });
        query.push(" ON CONFLICT (brand_product_code) DO NOTHING RETURNING brand_product_code");

        let written = query
            .build_query_scalar::<String>()
            .fetch_all(&mut **tx)
            .await?;
        inserted += written.len();
    }

    let count_after = count_for_brand(tx, brand_id).await?;
    Ok(InsertOutcome {
        count_before,
        count_after,
        inserted,
    })
}

#[async_trait]
impl BeadTable for PgBeadTable {
    async fn column_names(&self) -> Result<Option<Vec<String>>, ImportError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = 'beads')",
        )
        .fetch_one(&self.pool)
        .await?;
        if !exists {
            return Ok(None);
        }

        let columns = sqlx::query_scalar::<_, String>(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = 'beads'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(columns))
    }

    async fn insert_ignoring_conflicts(
        &self,
        brand_id: i64,
        rows: &[BeadRow],
    ) -> Result<InsertOutcome, ImportError> {
        let mut tx = self.pool.begin().await?;

        match insert_rows(&mut tx, brand_id, rows).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                error!("Bulk insert failed: {}", e);
                match tx.rollback().await {
                    Ok(()) => info!("Transaction rolled back"),
                    Err(rollback) => error!("Rollback failed: {}", rollback),
                }
                Err(e.into())
            }
        }
    }

    async fn existing_codes(&self, brand_id: i64) -> Result<HashSet<String>, ImportError> {
        let codes = sqlx::query_scalar::<_, String>(
            "SELECT brand_product_code FROM beads WHERE brand_id = $1",
        )
        .bind(brand_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(codes.into_iter().collect())
    }
}
