use crate::domain::models::availability::AvailabilityWindow;
use crate::domain::ports::AvailabilityRepository;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresAvailabilityRepo {
    pool: PgPool,
}

impl PostgresAvailabilityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvailabilityRepository for PostgresAvailabilityRepo {
    async fn create(&self, window: &AvailabilityWindow) -> Result<AvailabilityWindow, AppError> {
        // Backed by an exclusion constraint on
        // (instructor_id, day_of_week, int4range(start_min, end_min)); 23P01
        // means another window already covers part of this range.
        let created = sqlx::query_as::<_, AvailabilityWindow>(
            "INSERT INTO availability_windows (id, instructor_id, day_of_week, start_min, end_min, created_at)
             SELECT $1, $2, $3, $4, $5, $6
             WHERE NOT EXISTS (
                 SELECT 1 FROM availability_windows
                 WHERE instructor_id = $2 AND day_of_week = $3 AND start_min < $5 AND end_min > $4
             )
             RETURNING *"
        )
            .bind(&window.id).bind(&window.instructor_id).bind(window.day_of_week)
            .bind(window.start_min).bind(window.end_min).bind(window.created_at)
            .fetch_optional(&self.pool).await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db) = e
                    && db.code().as_deref() == Some("23P01") {
                    return AppError::AvailabilityOverlap("window overlaps an existing one for this day".to_string());
                }
                AppError::Database(e)
            })?;

        created.ok_or_else(|| {
            AppError::AvailabilityOverlap("window overlaps an existing one for this day".to_string())
        })
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AvailabilityWindow>, AppError> {
        sqlx::query_as::<_, AvailabilityWindow>("SELECT * FROM availability_windows WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_instructor(&self, instructor_id: &str) -> Result<Vec<AvailabilityWindow>, AppError> {
        sqlx::query_as::<_, AvailabilityWindow>("SELECT * FROM availability_windows WHERE instructor_id = $1 ORDER BY day_of_week ASC, start_min ASC")
            .bind(instructor_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_for_day(&self, instructor_id: &str, day_of_week: i32) -> Result<Vec<AvailabilityWindow>, AppError> {
        sqlx::query_as::<_, AvailabilityWindow>("SELECT * FROM availability_windows WHERE instructor_id = $1 AND day_of_week = $2 ORDER BY start_min ASC")
            .bind(instructor_id).bind(day_of_week).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn delete(&self, instructor_id: &str, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM availability_windows WHERE id = $1 AND instructor_id = $2")
            .bind(id).bind(instructor_id).execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
