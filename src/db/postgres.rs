use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{FormStore, StoreError, StoreResult};
use crate::models::{Field, Form, FormSnapshot, FormStatus, NewActivity, NewSubmission};

#[derive(Debug, FromRow)]
struct FormRow {
    id: String,
    user_id: String,
    name: String,
    description: Option<String>,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    max_responses: Option<i32>,
    total_responses: i32,
    allow_multiple_submissions: bool,
    password_hash: Option<String>,
}

#[derive(Debug, FromRow)]
struct FieldRow {
    id: String,
    #[sqlx(rename = "type")]
    field_type: String,
    label: String,
    name: String,
    required: bool,
    config: Value,
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    id: String,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    max_responses: Option<i32>,
    total_responses: i32,
}

/// One form whose stored counters disagreed with its rows
#[derive(Debug, Clone, FromRow)]
pub struct CounterDrift {
    pub id: String,
    pub name: String,
    pub views_before: i32,
    pub views_after: i32,
    pub responses_before: i32,
    pub responses_after: i32,
}

fn parse_status(raw: &str) -> StoreResult<FormStatus> {
    raw.parse().map_err(StoreError::InvalidData)
}

impl From<FieldRow> for Field {
    fn from(row: FieldRow) -> Self {
        Self {
            id: row.id,
            field_type: row.field_type,
            label: row.label,
            name: row.name,
            required: row.required,
            config: row.config,
        }
    }
}

/// Postgres-backed store
#[derive(Debug, Clone)]
pub struct PgFormStore {
    pool: PgPool,
}

impl PgFormStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recompute `total_views` and `total_responses` from the rows they count.
    /// Returns only the forms that changed.
    pub async fn reconcile_counters(&self) -> StoreResult<Vec<CounterDrift>> {
        let drifts = sqlx::query_as::<_, CounterDrift>(
            r#"
            WITH actual AS (
                SELECT f.id,
                       f.name,
                       f.total_views AS views_before,
                       f.total_responses AS responses_before,
                       (SELECT COUNT(*) FROM form_views v WHERE v.form_id = f.id)::INT AS views_after,
                       (SELECT COUNT(*) FROM form_submissions s WHERE s.form_id = f.id)::INT AS responses_after
                FROM forms f
            )
            UPDATE forms
            SET total_views = actual.views_after,
                total_responses = actual.responses_after,
                updated_at = NOW()
            FROM actual
            WHERE forms.id = actual.id
              AND (forms.total_views <> actual.views_after
                   OR forms.total_responses <> actual.responses_after)
            RETURNING actual.id, actual.name, actual.views_before, actual.views_after,
                      actual.responses_before, actual.responses_after
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(drifts)
    }

    pub async fn count_forms(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM forms")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl FormStore for PgFormStore {
    async fn find_form(&self, form_id: &str) -> StoreResult<Option<Form>> {
        let row = sqlx::query_as::<_, FormRow>(
            r#"
            SELECT id, user_id, name, description, status, expires_at, max_responses,
                   total_responses, allow_multiple_submissions, password_hash
            FROM forms
            WHERE id = $1
            "#,
        )
        .bind(form_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let fields = sqlx::query_as::<_, FieldRow>(
            r#"
            SELECT id, type, label, name, required, config
            FROM fields
            WHERE form_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Form {
            status: parse_status(&row.status)?,
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            expires_at: row.expires_at,
            max_responses: row.max_responses,
            total_responses: row.total_responses,
            allow_multiple_submissions: row.allow_multiple_submissions,
            password_hash: row.password_hash,
            fields: fields.into_iter().map(Field::from).collect(),
        }))
    }

    async fn find_snapshot(&self, form_id: &str) -> StoreResult<Option<FormSnapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT id, status, expires_at, max_responses, total_responses
            FROM forms
            WHERE id = $1
            "#,
        )
        .bind(form_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(FormSnapshot {
                status: parse_status(&row.status)?,
                id: row.id,
                expires_at: row.expires_at,
                max_responses: row.max_responses,
                total_responses: row.total_responses,
            })
        })
        .transpose()
    }

    async fn find_password_hash(&self, form_id: &str) -> StoreResult<Option<Option<String>>> {
        let hash: Option<Option<String>> =
            sqlx::query_scalar("SELECT password_hash FROM forms WHERE id = $1")
                .bind(form_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(hash)
    }

    async fn record_view(&self, form_id: &str, fingerprint: &str) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO form_views (id, form_id, fingerprint)
            VALUES ($1, $2, $3)
            ON CONFLICT (form_id, fingerprint) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(form_id)
        .bind(fingerprint)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            sqlx::query("UPDATE forms SET total_views = total_views + 1 WHERE id = $1")
                .bind(form_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn has_submission_from(&self, form_id: &str, fingerprint: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM form_submissions WHERE form_id = $1 AND fingerprint = $2
            )
            "#,
        )
        .bind(form_id)
        .bind(fingerprint)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<String> {
        let submission_id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO form_submissions
                (id, form_id, fingerprint, ip_address, user_agent, started_at, completed_at, time_spent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&submission_id)
        .bind(&submission.form_id)
        .bind(&submission.fingerprint)
        .bind(&submission.ip_address)
        .bind(&submission.user_agent)
        .bind(submission.started_at)
        .bind(submission.completed_at)
        .bind(submission.time_spent)
        .execute(&mut *tx)
        .await?;

        if !submission.values.is_empty() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO submission_values (id, submission_id, field_id, type, value) ",
            );
            builder.push_values(submission.values.iter(), |mut row, value| {
                row.push_bind(Uuid::new_v4().to_string())
                    .push_bind(submission_id.clone())
                    .push_bind(value.field_id.clone())
                    .push_bind(value.field_type.clone())
                    .push_bind(value.value.clone());
            });
            builder.build().execute(&mut *tx).await?;
        }

        sqlx::query(
            r#"
            UPDATE forms
            SET total_responses = total_responses + 1,
                last_response_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(&submission.form_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(submission_id)
    }

    async fn record_activity(&self, activity: NewActivity) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activities (id, user_id, form_id, type, message)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&activity.user_id)
        .bind(&activity.form_id)
        .bind(activity.activity_type)
        .bind(&activity.message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
