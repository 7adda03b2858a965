//! # PersonStore
//!
//! Persistence for student records. A store can only insert a record or read one back
//! by id: records are never updated or deleted once written.
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::person::{NewPerson, Person};

/// Enumeration of errors for operations with a PersonStore.
/// Errors can originate from sqlx and are wrapped by us to provide additional context.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection failed with: {error}")]
    ConnectionError { error: sqlx::Error },
    #[error("{command} query failed with: {error}")]
    QueryError { command: String, error: sqlx::Error },
    #[error("migration failed with: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Persist a new record, returning it with its freshly assigned id.
    async fn insert(&self, person: NewPerson) -> StoreResult<Person>;

    /// Fetch a single record by id, `None` if no record has that id.
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Person>>;

    /// Check the backing store can serve requests.
    async fn ping(&self) -> StoreResult<()>;
}

const PERSON_COLUMNS: &str = r#"
    id, first_name, last_name, middle_name, parents_phone, viloyat, tuman, manzil,
    yonalish, about_me, oqigan_joyi, tugilgan_kun, gender, tg_username, email
"#;

/// A PersonStore backed by the `people` table in PostgreSQL.
#[derive(Clone)]
pub struct PgPersonStore {
    pool: PgPool,
}

impl PgPersonStore {
    /// Initialize a new PgPersonStore with a pool of at most `max_connections` connections.
    pub async fn new(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|error| StoreError::ConnectionError { error })?;

        Ok(Self { pool })
    }

    pub fn new_from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `people` table if it does not exist yet. Safe to run on every startup.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("../migrations").run(&self.pool).await?;

        Ok(())
    }
}

#[async_trait]
impl PersonStore for PgPersonStore {
    async fn insert(&self, person: NewPerson) -> StoreResult<Person> {
        let base_query = format!(
            r#"
INSERT INTO people
    (first_name, last_name, middle_name, parents_phone, viloyat, tuman, manzil,
     yonalish, about_me, oqigan_joyi, tugilgan_kun, gender, tg_username, email)
VALUES
    ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
RETURNING
    {PERSON_COLUMNS}
            "#
        );

        let start_time = Instant::now();

        let inserted: Person = sqlx::query_as(&base_query)
            .bind(person.first_name)
            .bind(person.last_name)
            .bind(person.middle_name)
            .bind(person.parents_phone)
            .bind(person.viloyat)
            .bind(person.tuman)
            .bind(person.manzil)
            .bind(person.yonalish)
            .bind(person.about_me)
            .bind(person.oqigan_joyi)
            .bind(person.tugilgan_kun)
            .bind(person.gender)
            .bind(person.tg_username)
            .bind(person.email)
            .fetch_one(&self.pool)
            .await
            .map_err(|error| StoreError::QueryError {
                command: "INSERT".to_owned(),
                error,
            })?;

        metrics::histogram!("registry_store_insert_seconds")
            .record(start_time.elapsed().as_secs_f64());

        Ok(inserted)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Person>> {
        let base_query = format!("SELECT {PERSON_COLUMNS} FROM people WHERE id = $1");

        sqlx::query_as(&base_query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| StoreError::QueryError {
                command: "SELECT".to_owned(),
                error,
            })
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|error| StoreError::ConnectionError { error })?;

        Ok(())
    }
}

/// A PersonStore that keeps records in memory, handing out ids from 1.
/// Nothing survives a restart: meant for tests and local runs without PostgreSQL.
#[derive(Default)]
pub struct MemoryPersonStore {
    people: Mutex<Vec<Person>>,
}

impl MemoryPersonStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.people.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.people.lock().await.is_empty()
    }
}

#[async_trait]
impl PersonStore for MemoryPersonStore {
    async fn insert(&self, person: NewPerson) -> StoreResult<Person> {
        let mut people = self.people.lock().await;
        let id = people.last().map_or(1, |last| last.id + 1);
        let person = person.with_id(id);
        people.push(person.clone());

        Ok(person)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Person>> {
        let people = self.people.lock().await;

        Ok(people.iter().find(|person| person.id == id).cloned())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_person(first_name: &str) -> NewPerson {
        NewPerson {
            first_name: first_name.to_owned(),
            last_name: "Valiyev".to_owned(),
            middle_name: None,
            parents_phone: Some("+998901234567".to_owned()),
            viloyat: Some("Samarqand".to_owned()),
            tuman: None,
            manzil: None,
            yonalish: Some("Matematika".to_owned()),
            about_me: None,
            oqigan_joyi: None,
            tugilgan_kun: NaiveDate::from_ymd_opt(2007, 1, 31),
            gender: None,
            tg_username: Some("@ali".to_owned()),
            email: Some("ali@example.com".to_owned()),
        }
    }

    async fn assert_insert_then_find(store: &dyn PersonStore) {
        let new = new_person("Ali");

        let inserted = store.insert(new.clone()).await.unwrap();
        let found = store.find_by_id(inserted.id).await.unwrap();

        assert_eq!(inserted, new.with_id(inserted.id));
        assert_eq!(found, Some(inserted));
    }

    async fn assert_identical_inserts_get_distinct_ids(store: &dyn PersonStore) {
        let first = store.insert(new_person("Ali")).await.unwrap();
        let second = store.insert(new_person("Ali")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.find_by_id(first.id).await.unwrap(), Some(first));
        assert_eq!(store.find_by_id(second.id).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_memory_insert_then_find() {
        assert_insert_then_find(&MemoryPersonStore::new()).await;
    }

    #[tokio::test]
    async fn test_memory_identical_inserts_get_distinct_ids() {
        let store = MemoryPersonStore::new();

        assert_identical_inserts_get_distinct_ids(&store).await;
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_memory_unknown_id_is_none() {
        let store = MemoryPersonStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.find_by_id(1).await.unwrap(), None);

        store.insert(new_person("Ali")).await.unwrap();
        assert!(!store.is_empty().await);

        assert_eq!(store.find_by_id(2).await.unwrap(), None);
        assert_eq!(store.find_by_id(-1).await.unwrap(), None);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_pg_insert_then_find(db: PgPool) {
        assert_insert_then_find(&PgPersonStore::new_from_pool(db)).await;
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_pg_identical_inserts_get_distinct_ids(db: PgPool) {
        assert_identical_inserts_get_distinct_ids(&PgPersonStore::new_from_pool(db)).await;
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_pg_unknown_id_is_none(db: PgPool) {
        let store = PgPersonStore::new_from_pool(db);

        assert_eq!(store.find_by_id(424242).await.unwrap(), None);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_pg_migrate_is_idempotent(db: PgPool) {
        let store = PgPersonStore::new_from_pool(db);

        store.migrate().await.unwrap();
        store.migrate().await.unwrap();
        store.ping().await.unwrap();
    }
}
