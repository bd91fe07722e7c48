// Audit logger
//
// Records price calculations and applied discounts to the audit trail.
// Failures are logged and swallowed so they never block a calculation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

pub struct AuditLogger {
    pool: PgPool,
}

impl AuditLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Log a finished price calculation
    pub async fn log_price_calculation(&self, product_id: i32, detail: JsonValue, effect: &str) {
        if let Err(e) = self
            .insert_audit_record(product_id, "calculation", None, detail, effect)
            .await
        {
            tracing::warn!("Failed to log price calculation: {}", e);
        }
    }

    /// Log one applied discount
    pub async fn log_discount_application(
        &self,
        product_id: i32,
        discount_id: i32,
        detail: JsonValue,
        effect: &str,
    ) {
        if let Err(e) = self
            .insert_audit_record(product_id, "discount", Some(discount_id), detail, effect)
            .await
        {
            tracing::warn!("Failed to log discount application: {}", e);
        }
    }

    async fn insert_audit_record(
        &self,
        product_id: i32,
        entry_type: &str,
        discount_id: Option<i32>,
        detail: JsonValue,
        effect: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO pricing_audit_log (product_id, entry_type, discount_id, detail, effect)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(product_id)
        .bind(entry_type)
        .bind(discount_id)
        .bind(detail)
        .bind(effect)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Retrieve the audit trail for a product, oldest first
    pub async fn get_audit_records(
        &self,
        product_id: i32,
    ) -> Result<Vec<AuditRecord>, sqlx::Error> {
        let records = sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT audit_id, product_id, entry_type, discount_id, detail, effect, created_at
            FROM pricing_audit_log
            WHERE product_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

/// Audit record from the database
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditRecord {
    pub audit_id: Uuid,
    pub product_id: i32,
    pub entry_type: String,
    pub discount_id: Option<i32>,
    pub detail: JsonValue,
    pub effect: String,
    pub created_at: DateTime<Utc>,
}
