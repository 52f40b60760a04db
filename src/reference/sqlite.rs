use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::{EmissionFigures, EmissionRow, PhotoRow, ReferenceData};
use crate::error::EstimateError;

/// SQLite-backed reference store
pub struct SqliteReferenceStore {
    pool: SqlitePool,
}

impl SqliteReferenceStore {
    /// Open an existing database and run migrations
    ///
    /// `database_url` is a sqlx URL such as `sqlite:./data/reference.db`.
    /// A missing file is a configuration error; `import` creates it.
    pub async fn open(database_url: &str, max_connections: u32) -> Result<Self, EstimateError> {
        Self::connect(database_url, max_connections, false).await
    }

    /// Open the database, creating the file if needed, and run migrations
    pub async fn create(database_url: &str, max_connections: u32) -> Result<Self, EstimateError> {
        Self::connect(database_url, max_connections, true).await
    }

    async fn connect(
        database_url: &str,
        max_connections: u32,
        create_if_missing: bool,
    ) -> Result<Self, EstimateError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| EstimateError::Configuration(format!("Invalid database URL: {}", e)))?
            .create_if_missing(create_if_missing)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| {
                EstimateError::Configuration(format!("Failed to open reference database: {}", e))
            })?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, EstimateError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| EstimateError::Configuration(format!("Migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Replace the contents of both tables in a single transaction
    pub async fn import(
        &self,
        emissions: &[EmissionRow],
        photos: &[PhotoRow],
    ) -> Result<(), EstimateError> {
        for row in emissions {
            row.check().map_err(EstimateError::Configuration)?;
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM epa_vehicles").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM vehicle_photos").execute(&mut *tx).await?;

        for row in emissions {
            sqlx::query(
                "INSERT INTO epa_vehicles (make, model, year, comb08, co2_tailpipe_gpm)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&row.make)
            .bind(&row.model)
            .bind(row.year)
            .bind(row.comb08)
            .bind(row.co2_tailpipe_gpm)
            .execute(&mut *tx)
            .await?;
        }

        for row in photos {
            sqlx::query("INSERT INTO vehicle_photos (model, year, image_url) VALUES (?, ?, ?)")
                .bind(&row.model)
                .bind(row.year)
                .bind(&row.image_url)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            emission_rows = emissions.len(),
            photo_rows = photos.len(),
            "Imported reference tables"
        );
        Ok(())
    }
}

#[async_trait]
impl ReferenceData for SqliteReferenceStore {
    async fn lookup_emission(
        &self,
        make: &str,
        model: &str,
        year: i32,
    ) -> Result<Option<EmissionFigures>, EstimateError> {
        let (mpg, co2) = sqlx::query_as::<_, (Option<f64>, Option<f64>)>(
            r#"
            SELECT AVG(comb08), AVG(co2_tailpipe_gpm)
            FROM epa_vehicles
            WHERE make = ? AND model = ? AND year = ?
            "#,
        )
        .bind(make)
        .bind(model)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(match (mpg, co2) {
            (Some(combined_mpg), Some(co2_grams_per_mile)) => Some(EmissionFigures {
                combined_mpg,
                co2_grams_per_mile,
            })
            .filter(EmissionFigures::is_usable),
            _ => None,
        })
    }

    async fn lookup_photos(&self, model: &str, year: i32) -> Result<Vec<String>, EstimateError> {
        let urls = sqlx::query_scalar::<_, String>(
            "SELECT image_url FROM vehicle_photos WHERE model = ? AND year = ? ORDER BY id",
        )
        .bind(model)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        Ok(urls)
    }

    async fn model_names(&self) -> Result<Vec<String>, EstimateError> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT model FROM vehicle_photos ORDER BY model",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }
}
