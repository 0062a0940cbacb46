use crate::domain::models::availability::AvailabilityWindow;
use crate::domain::ports::AvailabilityRepository;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteAvailabilityRepo {
    pool: SqlitePool,
}

impl SqliteAvailabilityRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvailabilityRepository for SqliteAvailabilityRepo {
    async fn create(&self, window: &AvailabilityWindow) -> Result<AvailabilityWindow, AppError> {
        // Insert and overlap check in one statement, same pattern as booking
        // creation, so concurrent adds cannot slip a collision through.
        let created = sqlx::query_as::<_, AvailabilityWindow>(
            "INSERT INTO availability_windows (id, instructor_id, day_of_week, start_min, end_min, created_at)
             SELECT ?, ?, ?, ?, ?, ?
             WHERE NOT EXISTS (
                 SELECT 1 FROM availability_windows
                 WHERE instructor_id = ? AND day_of_week = ? AND start_min < ? AND end_min > ?
             )
             RETURNING *"
        )
            .bind(&window.id).bind(&window.instructor_id).bind(window.day_of_week)
            .bind(window.start_min).bind(window.end_min).bind(window.created_at)
            .bind(&window.instructor_id).bind(window.day_of_week)
            .bind(window.end_min).bind(window.start_min)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?;

        created.ok_or_else(|| {
            AppError::AvailabilityOverlap("window overlaps an existing one for this day".to_string())
        })
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AvailabilityWindow>, AppError> {
        sqlx::query_as::<_, AvailabilityWindow>("SELECT * FROM availability_windows WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_instructor(&self, instructor_id: &str) -> Result<Vec<AvailabilityWindow>, AppError> {
        sqlx::query_as::<_, AvailabilityWindow>("SELECT * FROM availability_windows WHERE instructor_id = ? ORDER BY day_of_week ASC, start_min ASC")
            .bind(instructor_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_for_day(&self, instructor_id: &str, day_of_week: i32) -> Result<Vec<AvailabilityWindow>, AppError> {
        sqlx::query_as::<_, AvailabilityWindow>("SELECT * FROM availability_windows WHERE instructor_id = ? AND day_of_week = ? ORDER BY start_min ASC")
            .bind(instructor_id).bind(day_of_week).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn delete(&self, instructor_id: &str, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM availability_windows WHERE id = ? AND instructor_id = ?")
            .bind(id).bind(instructor_id).execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
