//! Postgres storage for enriched trips and their daily aggregates.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{EnrichedTrip, TimeCategory, TripFeatures, TripRecord};

/// Largest page any listing query returns.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Degrees of latitude per kilometre, used for the nearby bounding box.
const KM_PER_DEGREE: f64 = 111.32;

// 22 binds per row keeps each statement well under the Postgres parameter limit.
const INSERT_CHUNK_ROWS: usize = 1000;

const TRIP_COLUMNS: &str = "id, load_batch_id, trip_key, vendor_id, pickup_datetime, \
    dropoff_datetime, passenger_count, pickup_longitude, pickup_latitude, dropoff_longitude, \
    dropoff_latitude, store_and_fwd_flag, trip_duration, pickup_hour, pickup_day, pickup_month, \
    pickup_dayofweek, is_rush_hour, is_weekend, trip_distance, average_speed, time_category, \
    created_at, updated_at";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("trip {0} not found")]
    NotFound(i64),

    #[error("invalid stored row: {0}")]
    InvalidRow(String),
}

/// An enriched trip as persisted, with its surrogate key and load metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTrip {
    pub id: i64,
    pub load_batch_id: Uuid,
    pub trip: EnrichedTrip,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatistics {
    pub date: NaiveDate,
    pub total_trips: i64,
    /// Seconds.
    pub average_duration: f64,
    /// Miles.
    pub average_distance: f64,
    pub average_passengers: f64,
    pub total_passengers: i64,
    /// Busiest pickup hour; the earliest wins a tie. `None` when there were no trips.
    pub peak_hour: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPatterns {
    pub hourly_distribution: BTreeMap<i32, i64>,
    pub passenger_distribution: BTreeMap<i32, i64>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Inserts every trip under `batch_id` in one transaction; either all rows land or none.
    async fn insert_trips(
        &self,
        batch_id: Uuid,
        trips: &[EnrichedTrip],
    ) -> Result<u64, RepositoryError>;
    async fn get_trip(&self, id: i64) -> Result<StoredTrip, RepositoryError>;
    async fn delete_trip(&self, id: i64) -> Result<bool, RepositoryError>;
    async fn trips_by_timeframe(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<StoredTrip>, RepositoryError>;
    async fn trips_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: i64,
    ) -> Result<Vec<StoredTrip>, RepositoryError>;
    async fn daily_statistics(&self, date: NaiveDate) -> Result<DailyStatistics, RepositoryError>;
    async fn hourly_counts(&self, date: NaiveDate) -> Result<BTreeMap<i32, i64>, RepositoryError>;
    async fn trip_patterns(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TripPatterns, RepositoryError>;
    async fn refresh_daily_aggregate(
        &self,
        date: NaiveDate,
    ) -> Result<DailyStatistics, RepositoryError>;
}

pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// Half-width in degrees of the square searched around a point.
pub fn radius_in_degrees(radius_km: f64) -> f64 {
    radius_km / KM_PER_DEGREE
}

#[derive(Clone)]
pub struct PostgresTripRepository {
    pool: PgPool,
}

impl PostgresTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_trip_values(builder: &mut QueryBuilder<'_, Postgres>, batch_id: Uuid, chunk: &[EnrichedTrip]) {
    builder.push_values(chunk, |mut row, trip| {
        let record = &trip.record;
        let features = &trip.features;
        row.push_bind(batch_id)
            .push_bind(record.id.clone())
            .push_bind(record.vendor_id.clone())
            .push_bind(record.pickup_datetime)
            .push_bind(record.dropoff_datetime)
            .push_bind(record.passenger_count)
            .push_bind(record.pickup_longitude)
            .push_bind(record.pickup_latitude)
            .push_bind(record.dropoff_longitude)
            .push_bind(record.dropoff_latitude)
            .push_bind(record.store_and_fwd_flag.clone())
            .push_bind(record.trip_duration)
            .push_bind(features.pickup_hour as i32)
            .push_bind(features.pickup_day.clone())
            .push_bind(features.pickup_month as i32)
            .push_bind(features.pickup_dayofweek as i32)
            .push_bind(features.is_rush_hour)
            .push_bind(features.is_weekend)
            .push_bind(features.trip_distance)
            .push_bind(features.average_speed)
            .push_bind(features.time_category.as_str());
    });
}

fn non_negative(row: &PgRow, column: &str) -> Result<u32, RepositoryError> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| RepositoryError::InvalidRow(format!("{column} is negative: {value}")))
}

fn stored_trip_from_row(row: &PgRow) -> Result<StoredTrip, RepositoryError> {
    let category: String = row.try_get("time_category")?;
    let time_category = TimeCategory::try_from(category.as_str())
        .map_err(RepositoryError::InvalidRow)?;

    let record = TripRecord {
        id: row.try_get("trip_key")?,
        vendor_id: row.try_get("vendor_id")?,
        pickup_datetime: row.try_get("pickup_datetime")?,
        dropoff_datetime: row.try_get("dropoff_datetime")?,
        passenger_count: row.try_get("passenger_count")?,
        pickup_longitude: row.try_get("pickup_longitude")?,
        pickup_latitude: row.try_get("pickup_latitude")?,
        dropoff_longitude: row.try_get("dropoff_longitude")?,
        dropoff_latitude: row.try_get("dropoff_latitude")?,
        store_and_fwd_flag: row.try_get("store_and_fwd_flag")?,
        trip_duration: row.try_get("trip_duration")?,
    };
    let features = TripFeatures {
        pickup_hour: non_negative(row, "pickup_hour")?,
        pickup_day: row.try_get("pickup_day")?,
        pickup_month: non_negative(row, "pickup_month")?,
        pickup_dayofweek: non_negative(row, "pickup_dayofweek")?,
        is_rush_hour: row.try_get("is_rush_hour")?,
        is_weekend: row.try_get("is_weekend")?,
        trip_distance: row.try_get("trip_distance")?,
        average_speed: row.try_get("average_speed")?,
        time_category,
    };

    Ok(StoredTrip {
        id: row.try_get("id")?,
        load_batch_id: row.try_get("load_batch_id")?,
        trip: EnrichedTrip { record, features },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn daily_statistics_from_row(
    date: NaiveDate,
    row: &PgRow,
    peak_hour: Option<i32>,
) -> Result<DailyStatistics, RepositoryError> {
    Ok(DailyStatistics {
        date,
        total_trips: row.try_get("total_trips")?,
        average_duration: row.try_get("average_duration")?,
        average_distance: row.try_get("average_distance")?,
        average_passengers: row.try_get("average_passengers")?,
        total_passengers: row.try_get("total_passengers")?,
        peak_hour,
    })
}

fn counts_from_rows(rows: &[PgRow], key: &str) -> Result<BTreeMap<i32, i64>, RepositoryError> {
    rows.iter()
        .map(|row| -> Result<(i32, i64), RepositoryError> {
            Ok((row.try_get(key)?, row.try_get("count")?))
        })
        .collect()
}

#[async_trait]
impl TripRepository for PostgresTripRepository {
    async fn insert_trips(
        &self,
        batch_id: Uuid,
        trips: &[EnrichedTrip],
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in trips.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO taxi_trips (load_batch_id, trip_key, vendor_id, pickup_datetime, \
                 dropoff_datetime, passenger_count, pickup_longitude, pickup_latitude, \
                 dropoff_longitude, dropoff_latitude, store_and_fwd_flag, trip_duration, \
                 pickup_hour, pickup_day, pickup_month, pickup_dayofweek, is_rush_hour, \
                 is_weekend, trip_distance, average_speed, time_category) ",
            );
            push_trip_values(&mut builder, batch_id, chunk);
            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
            debug!(%batch_id, rows = chunk.len(), "inserted trip chunk");
        }

        tx.commit().await?;
        info!(%batch_id, inserted, "Trips stored");
        Ok(inserted)
    }

    async fn get_trip(&self, id: i64) -> Result<StoredTrip, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {TRIP_COLUMNS} FROM taxi_trips WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => stored_trip_from_row(&row),
            None => Err(RepositoryError::NotFound(id)),
        }
    }

    async fn delete_trip(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM taxi_trips WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn trips_by_timeframe(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<StoredTrip>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRIP_COLUMNS}
            FROM taxi_trips
            WHERE pickup_datetime >= $1 AND pickup_datetime <= $2
            ORDER BY pickup_datetime, id
            OFFSET $3
            LIMIT $4
            "#
        ))
        .bind(start)
        .bind(end)
        .bind(offset.max(0))
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(stored_trip_from_row).collect()
    }

    async fn trips_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: i64,
    ) -> Result<Vec<StoredTrip>, RepositoryError> {
        let delta = radius_in_degrees(radius_km);
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRIP_COLUMNS}
            FROM taxi_trips
            WHERE (pickup_latitude BETWEEN $1 AND $2 AND pickup_longitude BETWEEN $3 AND $4)
               OR (dropoff_latitude BETWEEN $1 AND $2 AND dropoff_longitude BETWEEN $3 AND $4)
            ORDER BY id
            LIMIT $5
            "#
        ))
        .bind(latitude - delta)
        .bind(latitude + delta)
        .bind(longitude - delta)
        .bind(longitude + delta)
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(stored_trip_from_row).collect()
    }

    async fn daily_statistics(&self, date: NaiveDate) -> Result<DailyStatistics, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*)::BIGINT AS total_trips,
                COALESCE(AVG(trip_duration), 0)::FLOAT8 AS average_duration,
                COALESCE(AVG(trip_distance), 0)::FLOAT8 AS average_distance,
                COALESCE(AVG(passenger_count), 0)::FLOAT8 AS average_passengers,
                COALESCE(SUM(passenger_count), 0)::BIGINT AS total_passengers
            FROM taxi_trips
            WHERE pickup_datetime::date = $1
            "#,
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        let peak_hour: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT EXTRACT(HOUR FROM pickup_datetime)::INT4 AS hour
            FROM taxi_trips
            WHERE pickup_datetime::date = $1
            GROUP BY hour
            ORDER BY COUNT(*) DESC, hour ASC
            LIMIT 1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        daily_statistics_from_row(date, &row, peak_hour)
    }

    async fn hourly_counts(&self, date: NaiveDate) -> Result<BTreeMap<i32, i64>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT EXTRACT(HOUR FROM pickup_datetime)::INT4 AS hour, COUNT(*)::BIGINT AS count
            FROM taxi_trips
            WHERE pickup_datetime::date = $1
            GROUP BY hour
            ORDER BY hour
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        counts_from_rows(&rows, "hour")
    }

    async fn trip_patterns(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TripPatterns, RepositoryError> {
        let hourly = sqlx::query(
            r#"
            SELECT EXTRACT(HOUR FROM pickup_datetime)::INT4 AS hour, COUNT(*)::BIGINT AS count
            FROM taxi_trips
            WHERE pickup_datetime >= $1 AND pickup_datetime <= $2
            GROUP BY hour
            ORDER BY hour
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let passengers = sqlx::query(
            r#"
            SELECT passenger_count, COUNT(*)::BIGINT AS count
            FROM taxi_trips
            WHERE pickup_datetime >= $1 AND pickup_datetime <= $2
            GROUP BY passenger_count
            ORDER BY passenger_count
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(TripPatterns {
            hourly_distribution: counts_from_rows(&hourly, "hour")?,
            passenger_distribution: counts_from_rows(&passengers, "passenger_count")?,
            start,
            end,
        })
    }

    async fn refresh_daily_aggregate(
        &self,
        date: NaiveDate,
    ) -> Result<DailyStatistics, RepositoryError> {
        let stats = self.daily_statistics(date).await?;

        sqlx::query(
            r#"
            INSERT INTO trip_aggregations (
                date,
                total_trips,
                average_duration,
                average_distance,
                average_passengers,
                total_passengers,
                peak_hour
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (date) DO UPDATE SET
                total_trips = EXCLUDED.total_trips,
                average_duration = EXCLUDED.average_duration,
                average_distance = EXCLUDED.average_distance,
                average_passengers = EXCLUDED.average_passengers,
                total_passengers = EXCLUDED.total_passengers,
                peak_hour = EXCLUDED.peak_hour,
                updated_at = now()
            "#,
        )
        .bind(stats.date)
        .bind(stats.total_trips)
        .bind(stats.average_duration)
        .bind(stats.average_distance)
        .bind(stats.average_passengers)
        .bind(stats.total_passengers)
        .bind(stats.peak_hour)
        .execute(&self.pool)
        .await?;

        debug!(%date, total_trips = stats.total_trips, "daily aggregate refreshed");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_errors_name_what_went_wrong() {
        let messages: Vec<String> = [
            RepositoryError::NotFound(42),
            RepositoryError::InvalidRow("pickup_hour is negative: -1".to_string()),
        ]
        .iter()
        .map(|err| match err {
            RepositoryError::Database(_) => unreachable!(),
            RepositoryError::NotFound(_) | RepositoryError::InvalidRow(_) => err.to_string(),
        })
        .collect();

        assert_eq!(
            messages,
            [
                "trip 42 not found",
                "invalid stored row: pickup_hour is negative: -1"
            ]
        );
    }

    #[test]
    fn limits_are_clamped_to_page_bounds() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-5), 1);
        assert_eq!(clamp_limit(100), 100);
        assert_eq!(clamp_limit(5000), MAX_PAGE_SIZE);
    }

    #[test]
    fn one_degree_box_per_111_km() {
        assert!((radius_in_degrees(111.32) - 1.0).abs() < 1e-12);
        assert!((radius_in_degrees(1.0) - 0.008983).abs() < 1e-6);
    }
}
