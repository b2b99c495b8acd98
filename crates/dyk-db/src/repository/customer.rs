//! # Customer Repository
//!
//! Customer accounts created or reused at checkout.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use dyk_core::Customer;

const CUSTOMER_COLUMNS: &str = r#"
    id, email, first_name, last_name, phone, address, zip, city,
    password_hash, gdpr_consent, gdpr_consent_at, created_at
"#;

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Finds a customer by e-mail (case-insensitive) on the caller's connection.
    pub async fn find_by_email(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> DbResult<Option<Customer>> {
        let sql = format!(
            "SELECT {} FROM customers WHERE email = ?1 COLLATE NOCASE",
            CUSTOMER_COLUMNS
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(email.trim())
            .fetch_optional(&mut *conn)
            .await?;

        Ok(customer)
    }

    /// Checks that a customer ID exists on the caller's connection.
    pub async fn exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(found.is_some())
    }

    /// Inserts a customer on the caller's connection.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - e-mail already registered
    pub async fn insert(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, email, first_name, last_name, phone, address, zip, city,
                password_hash, gdpr_consent, gdpr_consent_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&customer.id)
        .bind(customer.email.trim())
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.zip)
        .bind(&customer.city)
        .bind(&customer.password_hash)
        .bind(customer.gdpr_consent)
        .bind(customer.gdpr_consent_at)
        .bind(customer.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: customer.email.clone(),
            },
            other => other,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_customer, test_db};

    #[tokio::test]
    async fn test_insert_and_find_by_email() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let customer = sample_customer("cust-1", "anna@example.se");
        CustomerRepository::insert(&mut conn, &customer).await.unwrap();

        let found = CustomerRepository::find_by_email(&mut conn, "ANNA@example.se")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "cust-1");
        assert!(found.gdpr_consent);
        assert!(CustomerRepository::exists(&mut conn, "cust-1").await.unwrap());
        assert!(!CustomerRepository::exists(&mut conn, "cust-2").await.unwrap());
        drop(conn);

        let by_id = db.customers().get_by_id("cust-1").await.unwrap().unwrap();
        assert_eq!(by_id.full_name(), "Anna Svensson");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        CustomerRepository::insert(&mut conn, &sample_customer("cust-1", "anna@example.se"))
            .await
            .unwrap();
        let err = CustomerRepository::insert(&mut conn, &sample_customer("cust-2", "Anna@Example.se"))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { value, .. } if value == "Anna@Example.se"));
    }
}
