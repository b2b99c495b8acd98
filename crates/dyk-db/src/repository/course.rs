//! # Course Repository
//!
//! Read access to the course catalogue, plus inserts for seeding and tests.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use dyk_core::Course;

const COURSE_COLUMNS: &str = r#"
    id, name, description, price_cents, vat_rate_bps, is_active, created_at, updated_at
"#;

/// Repository for course database operations.
#[derive(Debug, Clone)]
pub struct CourseRepository {
    pool: SqlitePool,
}

impl CourseRepository {
    /// Creates a new CourseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CourseRepository { pool }
    }

    /// Gets a course by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Course))` - Course found
    /// * `Ok(None)` - Course not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Course>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Looks a course up on the caller's connection (inside an order
    /// transaction). Inactive courses are still returned; retiring a course
    /// does not invalidate carts already submitted.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Course>> {
        let sql = format!("SELECT {} FROM courses WHERE id = ?1", COURSE_COLUMNS);
        let course = sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(course)
    }

    /// Lists active courses ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<Course>> {
        let sql = format!(
            "SELECT {} FROM courses WHERE is_active = 1 ORDER BY name",
            COURSE_COLUMNS
        );
        let courses = sqlx::query_as::<_, Course>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(courses)
    }

    /// Inserts a course.
    pub async fn insert(&self, course: &Course) -> DbResult<()> {
        debug!(id = %course.id, name = %course.name, "Inserting course");

        sqlx::query(
            r#"
            INSERT INTO courses (
                id, name, description, price_cents, vat_rate_bps,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&course.id)
        .bind(&course.name)
        .bind(&course.description)
        .bind(course.price_cents)
        .bind(course.vat_rate_bps)
        .bind(course.is_active)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_course, test_db};
    use dyk_core::VatRate;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.courses();

        repo.insert(&sample_course("c-ow", Some(600))).await.unwrap();
        repo.insert(&sample_course("c-free", None)).await.unwrap();

        let course = repo.get_by_id("c-ow").await.unwrap().unwrap();
        assert_eq!(course.price_cents, 450_000);
        assert_eq!(course.vat_rate(), VatRate::from_bps(600));

        let fallback = repo.get_by_id("c-free").await.unwrap().unwrap();
        assert_eq!(fallback.vat_rate_bps, None);
        assert_eq!(fallback.vat_rate(), VatRate::REDUCED_EDUCATION);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert_eq!(repo.list_active().await.unwrap().len(), 2);
    }
}
