// src/profiles/postgres.rs
use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{ProfileRecord, ProfileStore};

/// Reads the `idols` table maintained by the ingestion job.
///
/// Columns: `name`, `group_name`, `aliases` (`;`-separated), `birth_date`,
/// `instagram`, `twitter`; all but `name` nullable.
pub struct PgProfileStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct IdolRow {
    name: String,
    group_name: Option<String>,
    aliases: Option<String>,
    birth_date: Option<String>,
    instagram: Option<String>,
    twitter: Option<String>,
}

impl From<IdolRow> for ProfileRecord {
    fn from(r: IdolRow) -> Self {
        let blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        ProfileRecord {
            name: r.name.trim().to_string(),
            group: blank(r.group_name),
            aliases: r
                .aliases
                .unwrap_or_default()
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            birth_date: blank(r.birth_date),
            instagram: blank(r.instagram),
            twitter: blank(r.twitter),
        }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT name, group_name, aliases, birth_date::text AS birth_date, instagram, twitter FROM idols";

impl PgProfileStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await
            .context("connecting to profiles database")?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_by_name(&self, name: &str) -> Result<Vec<ProfileRecord>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE lower(name) = lower($1) \
             OR lower($1) = ANY(regexp_split_to_array(lower(coalesce(aliases, '')), '\\s*;\\s*')) \
             ORDER BY id"
        );
        let rows = sqlx::query_as::<_, IdolRow>(&sql)
            .bind(name.trim())
            .fetch_all(&self.pool)
            .await
            .context("querying idols by name")?;
        Ok(rows.into_iter().map(ProfileRecord::from).collect())
    }

    async fn find_members(&self, group: &str) -> Result<Vec<ProfileRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE lower(group_name) = lower($1) ORDER BY id");
        let rows = sqlx::query_as::<_, IdolRow>(&sql)
            .bind(group.trim())
            .fetch_all(&self.pool)
            .await
            .context("querying idols by group")?;
        Ok(rows.into_iter().map(ProfileRecord::from).collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
