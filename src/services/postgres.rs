use crate::models::{
    CandidateRecord, FitLabel, IcpProfile, Location, Organization, ProviderKind, QualificationResult,
    QualifiedLead, ScoreSource,
};
use crate::services::store::{LeadListCriteria, LeadPage, LeadStore, StoreError};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use std::time::Duration;

/// PostgreSQL lead store
///
/// Keeps every lead an owner has saved so later searches can skip
/// re-enriching and re-scoring them, plus one ICP per owner.
pub struct PostgresLeadStore {
    pool: PgPool,
}

impl PostgresLeadStore {
    /// Create a new store from a connection string and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn lead_from_row(row: &PgRow) -> Result<QualifiedLead, StoreError> {
    let provider: String = row.try_get("provider")?;
    let provider: ProviderKind = provider.parse().map_err(StoreError::InvalidRecord)?;
    let label: String = row.try_get("label")?;
    let label: FitLabel = label.parse().map_err(StoreError::InvalidRecord)?;
    let source: String = row.try_get("score_source")?;
    let source = match source.as_str() {
        "fallback" => ScoreSource::Fallback,
        _ => ScoreSource::Model,
    };

    let score: i16 = row.try_get("score")?;
    let employee_count: Option<i64> = row.try_get("employee_count")?;
    let data_accuracy: Option<i16> = row.try_get("data_accuracy")?;

    let candidate = CandidateRecord {
        id: row.try_get("provider_id")?,
        provider,
        full_name: row.try_get("full_name")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        title: row.try_get("title")?,
        organization: Organization {
            name: row.try_get("company_name")?,
            website: row.try_get("company_website")?,
            industry: row.try_get("industry")?,
            employee_count: employee_count.map(|n| n.max(0) as u64),
        },
        location: Location {
            city: row.try_get("city")?,
            region: row.try_get("region")?,
            country: row.try_get("country")?,
        },
        linkedin_url: row.try_get("linkedin_url")?,
        email: row.try_get("email")?,
        email_status: row.try_get("email_status")?,
        phone: row.try_get("phone")?,
        phone_numbers: Vec::new(),
        raw: row.try_get("raw")?,
    };

    let qualification = QualificationResult {
        score: score.clamp(0, 100) as u8,
        label,
        reason: row.try_get("reason")?,
        tags: row.try_get("tags")?,
        source,
        linkedin_verified: row.try_get("linkedin_verified")?,
        data_accuracy: data_accuracy.map(|a| a.clamp(0, 100) as u8),
        discrepancies: row.try_get("discrepancies")?,
    };

    Ok(QualifiedLead { candidate, qualification, already_saved: true })
}

fn push_list_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    owner: &'a str,
    criteria: &'a LeadListCriteria,
) {
    builder.push(" WHERE owner_id = ").push_bind(owner);

    if let Some(label) = criteria.label {
        builder.push(" AND label = ").push_bind(label.as_str());
    }
    if let Some(min_score) = criteria.min_score {
        builder.push(" AND score >= ").push_bind(min_score as i16);
    }
    if let Some(search) = criteria.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.replace('%', "\\%").replace('_', "\\_"));
        builder
            .push(" AND (full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR company_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl LeadStore for PostgresLeadStore {
    async fn find_saved(
        &self,
        owner: &str,
        provider: ProviderKind,
        provider_id: &str,
    ) -> Result<Option<QualifiedLead>, StoreError> {
        let query = r#"
            SELECT *
            FROM leads
            WHERE owner_id = $1 AND provider = $2 AND provider_id = $3
        "#;

        let row = sqlx::query(query)
            .bind(owner)
            .bind(provider.as_str())
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(lead_from_row).transpose()
    }

    /// One round trip for the whole batch
    async fn find_saved_many(
        &self,
        owner: &str,
        provider: ProviderKind,
        provider_ids: &[String],
    ) -> Result<HashMap<String, QualifiedLead>, StoreError> {
        if provider_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = r#"
            SELECT *
            FROM leads
            WHERE owner_id = $1 AND provider = $2 AND provider_id = ANY($3)
        "#;

        let rows = sqlx::query(query)
            .bind(owner)
            .bind(provider.as_str())
            .bind(provider_ids)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let lead = lead_from_row(row)?;
                Ok((lead.candidate.id.clone(), lead))
            })
            .collect()
    }

    /// Uses INSERT ... ON CONFLICT so re-saving refreshes the qualification
    async fn save(&self, owner: &str, lead: &QualifiedLead) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO leads (
                id, owner_id, provider, provider_id, full_name, first_name, last_name, title,
                company_name, company_website, industry, employee_count, city, region, country,
                linkedin_url, email, email_status, phone, score, label, reason, tags,
                score_source, linkedin_verified, data_accuracy, discrepancies, raw
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28
            )
            ON CONFLICT (owner_id, provider, provider_id)
            DO UPDATE SET
                email = COALESCE(EXCLUDED.email, leads.email),
                email_status = COALESCE(EXCLUDED.email_status, leads.email_status),
                phone = COALESCE(EXCLUDED.phone, leads.phone),
                score = EXCLUDED.score,
                label = EXCLUDED.label,
                reason = EXCLUDED.reason,
                tags = EXCLUDED.tags,
                score_source = EXCLUDED.score_source,
                linkedin_verified = EXCLUDED.linkedin_verified,
                data_accuracy = EXCLUDED.data_accuracy,
                discrepancies = EXCLUDED.discrepancies,
                updated_at = NOW()
        "#;

        let c = &lead.candidate;
        let q = &lead.qualification;

        sqlx::query(query)
            .bind(uuid::Uuid::new_v4())
            .bind(owner)
            .bind(c.provider.as_str())
            .bind(&c.id)
            .bind(&c.full_name)
            .bind(&c.first_name)
            .bind(&c.last_name)
            .bind(&c.title)
            .bind(&c.organization.name)
            .bind(&c.organization.website)
            .bind(&c.organization.industry)
            .bind(c.organization.employee_count.map(|n| n.min(i64::MAX as u64) as i64))
            .bind(&c.location.city)
            .bind(&c.location.region)
            .bind(&c.location.country)
            .bind(&c.linkedin_url)
            .bind(&c.email)
            .bind(&c.email_status)
            .bind(&c.phone)
            .bind(q.score as i16)
            .bind(q.label.as_str())
            .bind(&q.reason)
            .bind(&q.tags)
            .bind(q.source.as_str())
            .bind(q.linkedin_verified)
            .bind(q.data_accuracy.map(i16::from))
            .bind(&q.discrepancies)
            .bind(&c.raw)
            .execute(&self.pool)
            .await?;

        tracing::debug!(owner, candidate_id = %c.id, "Saved lead");

        Ok(())
    }

    async fn list(&self, owner: &str, criteria: &LeadListCriteria) -> Result<LeadPage, StoreError> {
        let limit = criteria.limit.max(1) as i64;
        let offset = (criteria.page.max(1) as i64 - 1) * limit;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM leads");
        push_list_filters(&mut count, owner, criteria);
        let total: i64 = count.build().fetch_one(&self.pool).await?.try_get("total")?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM leads");
        push_list_filters(&mut select, owner, criteria);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select.build().fetch_all(&self.pool).await?;
        let leads = rows.iter().map(lead_from_row).collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Owner {} has {} saved leads matching filters", owner, total);

        Ok(LeadPage { leads, total: total.max(0) as u64 })
    }

    async fn get_icp(&self, owner: &str) -> Result<Option<IcpProfile>, StoreError> {
        let query = r#"
            SELECT description, industries, locations, role_titles, min_employees, max_employees
            FROM icp_profiles
            WHERE owner_id = $1
        "#;

        let Some(row) = sqlx::query(query).bind(owner).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };

        let min_employees: Option<i64> = row.try_get("min_employees")?;
        let max_employees: Option<i64> = row.try_get("max_employees")?;

        Ok(Some(IcpProfile {
            description: row.try_get("description")?,
            industries: row.try_get("industries")?,
            locations: row.try_get("locations")?,
            role_titles: row.try_get("role_titles")?,
            min_employees: min_employees.map(|n| n.max(0) as u64),
            max_employees: max_employees.map(|n| n.max(0) as u64),
        }))
    }

    async fn upsert_icp(&self, owner: &str, icp: &IcpProfile) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO icp_profiles (
                owner_id, description, industries, locations, role_titles, min_employees, max_employees
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (owner_id)
            DO UPDATE SET
                description = EXCLUDED.description,
                industries = EXCLUDED.industries,
                locations = EXCLUDED.locations,
                role_titles = EXCLUDED.role_titles,
                min_employees = EXCLUDED.min_employees,
                max_employees = EXCLUDED.max_employees,
                updated_at = NOW()
        "#;

        sqlx::query(query)
            .bind(owner)
            .bind(&icp.description)
            .bind(&icp.industries)
            .bind(&icp.locations)
            .bind(&icp.role_titles)
            .bind(icp.min_employees.map(|n| n.min(i64::MAX as u64) as i64))
            .bind(icp.max_employees.map(|n| n.min(i64::MAX as u64) as i64))
            .execute(&self.pool)
            .await?;

        tracing::info!("Saved ICP profile for owner {}", owner);

        Ok(())
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(Into::into)
    }
}
