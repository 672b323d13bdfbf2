//! Postgres debt store
//!
//! The pool is created lazily; the schema is created on first use.

use crate::error::NavigatorError;
use crate::models::{DebtRecord, DebtTerms, NewDebt};
use crate::store::{validate_new_debt, DebtStore};
use crate::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct PgDebtStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgDebtStore {
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect_lazy(url)?;

        Ok(Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS debts (
                      id BIGSERIAL PRIMARY KEY,
                      user_id BIGINT NOT NULL,
                      name TEXT NOT NULL,
                      amount DOUBLE PRECISION NOT NULL,
                      interest_rate DOUBLE PRECISION NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query("CREATE INDEX IF NOT EXISTS idx_debts_user ON debts (user_id);")
                    .execute(&self.pool)
                    .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                NavigatorError::DatabaseError(format!(
                    "Failed to initialize debt store schema: {}",
                    e
                ))
            })?;

        Ok(())
    }

    fn record_from_row(row: &PgRow) -> Result<DebtRecord> {
        Ok(DebtRecord {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            amount: row.try_get("amount")?,
            interest_rate: row.try_get("interest_rate")?,
        })
    }
}

#[async_trait]
impl DebtStore for PgDebtStore {
    async fn create_debt(&self, debt: NewDebt) -> Result<DebtRecord> {
        validate_new_debt(&debt)?;
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO debts (user_id, name, amount, interest_rate)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, amount, interest_rate
            "#,
        )
        .bind(debt.user_id)
        .bind(&debt.name)
        .bind(debt.amount)
        .bind(debt.interest_rate)
        .fetch_one(&self.pool)
        .await?;

        Self::record_from_row(&row)
    }

    async fn list_debts(&self, user_id: i64) -> Result<Vec<DebtRecord>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            "SELECT id, user_id, name, amount, interest_rate FROM debts WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::record_from_row).collect()
    }

    async fn lookup_debt(&self, debt_id: i64) -> Result<Option<DebtTerms>> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT amount, interest_rate FROM debts WHERE id = $1")
            .bind(debt_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| -> Result<DebtTerms> {
            Ok(DebtTerms {
                amount: r.try_get("amount")?,
                interest_rate: r.try_get("interest_rate")?,
            })
        })
        .transpose()
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool> {
        self.ensure_schema().await?;

        let result = sqlx::query("DELETE FROM debts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
