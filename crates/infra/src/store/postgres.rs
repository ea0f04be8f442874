//! Postgres-backed stores.
//!
//! One [`PostgresStore`] over a shared pool implements all three store
//! traits. Every query carries `user_id` in its `WHERE` clause.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | duplicate email/public id, active person name clash |
//! | Database (other) | Any other | `Backend` | check constraint, syntax, etc. |
//! | PoolClosed / Io / other | N/A | `Backend` | store closed or unreachable |
//!
//! Creation order is kept in a `seq BIGSERIAL` column and used as the
//! tie-breaker wherever listing order matters.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use fintrack_auth::{Entitlement, User};
use fintrack_core::{PersonId, TransactionId, UserId};
use fintrack_ledger::{
    BalanceChange, CashBank, Person, PersonMetadata, SectionType, Transaction,
    TransactionMetadata, TransactionStatus,
};

use super::{BalanceStore, LedgerStore, StoreError, StoreResult, UserStore};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const PERSON_COLUMNS: &str =
    "id, user_id, name, email, phone, section_type, metadata, is_active, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, person_id, user_id, date, amount, remarks, status, kind, \
     metadata, created_at, updated_at";

const USER_COLUMNS: &str = "id, public_id, email, password_hash, display_name, photo_url, \
     is_active, entitlements, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&*self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert(&self, user: User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, public_id, email, password_hash, display_name, photo_url,
                is_active, entitlements, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.public_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.photo_url)
        .bind(user.is_active)
        .bind(entitlement_names(&user.entitlements))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET display_name = $2, photo_url = $3, is_active = $4,
                entitlements = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.display_name)
        .bind(&user.photo_url)
        .bind(user.is_active)
        .bind(entitlement_names(&user.entitlements))
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        expect_one_row(result.rows_affected(), "user", user.id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for PostgresStore {
    #[instrument(skip(self, person), fields(user_id = %person.user_id, person_id = %person.id), err)]
    async fn insert_person(&self, person: Person) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO persons (
                id, user_id, name, email, phone, section_type, metadata,
                is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(person.id.as_uuid())
        .bind(person.user_id.as_uuid())
        .bind(&person.name)
        .bind(&person.email)
        .bind(&person.phone)
        .bind(person.section_type.as_str())
        .bind(Json(&person.metadata))
        .bind(person.is_active)
        .bind(person.created_at)
        .bind(person.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_person", e))?;
        Ok(())
    }

    #[instrument(skip(self, person), fields(user_id = %person.user_id, person_id = %person.id), err)]
    async fn update_person(&self, person: &Person) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE persons
            SET name = $3, email = $4, phone = $5, metadata = $6,
                is_active = $7, updated_at = $8
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(person.id.as_uuid())
        .bind(person.user_id.as_uuid())
        .bind(&person.name)
        .bind(&person.email)
        .bind(&person.phone)
        .bind(Json(&person.metadata))
        .bind(person.is_active)
        .bind(person.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_person", e))?;

        expect_one_row(result.rows_affected(), "person", person.id)
    }

    async fn get_person(&self, owner: UserId, id: PersonId) -> StoreResult<Option<Person>> {
        let row = sqlx::query(&format!(
            "SELECT {PERSON_COLUMNS} FROM persons WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(owner.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_person", e))?;
        row.as_ref().map(person_from_row).transpose()
    }

    async fn list_persons(&self, owner: UserId, section: SectionType) -> StoreResult<Vec<Person>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PERSON_COLUMNS} FROM persons
            WHERE user_id = $1 AND section_type = $2 AND is_active
            ORDER BY seq DESC
            "#
        ))
        .bind(owner.as_uuid())
        .bind(section.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_persons", e))?;
        rows.iter().map(person_from_row).collect()
    }

    async fn persons_by_ids(&self, owner: UserId, ids: &[PersonId]) -> StoreResult<Vec<Person>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PERSON_COLUMNS} FROM persons WHERE user_id = $1 AND id = ANY($2)"
        ))
        .bind(owner.as_uuid())
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("persons_by_ids", e))?;
        rows.iter().map(person_from_row).collect()
    }

    #[instrument(skip(self, tx), fields(user_id = %tx.user_id, transaction_id = %tx.id), err)]
    async fn insert_transaction(&self, tx: Transaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, person_id, user_id, date, amount, remarks, status, kind,
                metadata, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(tx.id.as_uuid())
        .bind(tx.person_id.as_uuid())
        .bind(tx.user_id.as_uuid())
        .bind(tx.date)
        .bind(tx.amount)
        .bind(&tx.remarks)
        .bind(tx.status.as_str())
        .bind(&tx.kind)
        .bind(Json(&tx.metadata))
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_transaction", e))?;
        Ok(())
    }

    async fn update_transaction(&self, tx: &Transaction) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET date = $3, amount = $4, remarks = $5, status = $6, kind = $7,
                metadata = $8, updated_at = $9
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(tx.id.as_uuid())
        .bind(tx.user_id.as_uuid())
        .bind(tx.date)
        .bind(tx.amount)
        .bind(&tx.remarks)
        .bind(tx.status.as_str())
        .bind(&tx.kind)
        .bind(Json(&tx.metadata))
        .bind(tx.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_transaction", e))?;

        expect_one_row(result.rows_affected(), "transaction", tx.id)
    }

    async fn get_transaction(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(owner.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_transaction", e))?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn delete_transaction(&self, owner: UserId, id: TransactionId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(owner.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_transaction", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn transactions_for_person(
        &self,
        owner: UserId,
        person: PersonId,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE user_id = $1 AND person_id = $2
            ORDER BY seq ASC
            "#
        ))
        .bind(owner.as_uuid())
        .bind(person.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("transactions_for_person", e))?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn recent_transactions(
        &self,
        owner: UserId,
        limit: usize,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE user_id = $1
            ORDER BY date DESC, seq ASC
            LIMIT $2
            "#
        ))
        .bind(owner.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("recent_transactions", e))?;
        rows.iter().map(transaction_from_row).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Balances
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BalanceStore for PostgresStore {
    #[instrument(skip(self), fields(user_id = %owner), err)]
    async fn get_or_create(&self, owner: UserId, now: DateTime<Utc>) -> StoreResult<CashBank> {
        // A racing creator loses on the primary key and reads the winner's row.
        sqlx::query(
            r#"
            INSERT INTO cash_banks (user_id, cash, bank, history, created_at, updated_at)
            VALUES ($1, 0, 0, '[]'::jsonb, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(owner.as_uuid())
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_cash_bank", e))?;

        let row = sqlx::query(
            r#"
            SELECT user_id, cash, bank, history, created_at, updated_at
            FROM cash_banks
            WHERE user_id = $1
            "#,
        )
        .bind(owner.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_cash_bank", e))?;

        cash_bank_from_row(&row)
    }

    async fn save(&self, record: &CashBank) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cash_banks
            SET cash = $2, bank = $3, history = $4, updated_at = $5
            WHERE user_id = $1
            "#,
        )
        .bind(record.user_id.as_uuid())
        .bind(record.cash)
        .bind(record.bank)
        .bind(Json(&record.history))
        .bind(record.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_cash_bank", e))?;

        expect_one_row(result.rows_affected(), "cash/bank record", record.user_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn decode_err(what: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("failed to decode {what} row: {err}"))
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let decode = |e: sqlx::Error| decode_err("user", e);
    let names: Vec<String> = row.try_get("entitlements").map_err(decode)?;

    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(decode)?),
        public_id: row.try_get("public_id").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        display_name: row.try_get("display_name").map_err(decode)?,
        photo_url: row.try_get("photo_url").map_err(decode)?,
        is_active: row.try_get("is_active").map_err(decode)?,
        entitlements: names.iter().filter_map(|n| Entitlement::parse(n)).collect(),
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn person_from_row(row: &PgRow) -> StoreResult<Person> {
    let decode = |e: sqlx::Error| decode_err("person", e);
    let section: String = row.try_get("section_type").map_err(decode)?;
    let Json(metadata): Json<PersonMetadata> = row.try_get("metadata").map_err(decode)?;

    Ok(Person {
        id: PersonId::from_uuid(row.try_get("id").map_err(decode)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        section_type: section
            .parse::<SectionType>()
            .map_err(|e| decode_err("person", e))?,
        metadata,
        is_active: row.try_get("is_active").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn transaction_from_row(row: &PgRow) -> StoreResult<Transaction> {
    let decode = |e: sqlx::Error| decode_err("transaction", e);
    let status: String = row.try_get("status").map_err(decode)?;
    let Json(metadata): Json<TransactionMetadata> = row.try_get("metadata").map_err(decode)?;

    Ok(Transaction {
        id: TransactionId::from_uuid(row.try_get("id").map_err(decode)?),
        person_id: PersonId::from_uuid(row.try_get("person_id").map_err(decode)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        date: row.try_get("date").map_err(decode)?,
        amount: row.try_get::<Decimal, _>("amount").map_err(decode)?,
        remarks: row.try_get("remarks").map_err(decode)?,
        status: status
            .parse::<TransactionStatus>()
            .map_err(|e| decode_err("transaction", e))?,
        kind: row.try_get("kind").map_err(decode)?,
        metadata,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn cash_bank_from_row(row: &PgRow) -> StoreResult<CashBank> {
    let decode = |e: sqlx::Error| decode_err("cash/bank", e);
    let Json(history): Json<Vec<BalanceChange>> = row.try_get("history").map_err(decode)?;

    Ok(CashBank {
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        cash: row.try_get("cash").map_err(decode)?,
        bank: row.try_get("bank").map_err(decode)?,
        history,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn entitlement_names(entitlements: &BTreeSet<Entitlement>) -> Vec<String> {
    entitlements.iter().map(|e| e.as_str().to_string()).collect()
}

fn expect_one_row(affected: u64, what: &str, id: impl core::fmt::Display) -> StoreResult<()> {
    if affected == 0 {
        Err(StoreError::Backend(format!("{what} {id} vanished")))
    } else {
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
