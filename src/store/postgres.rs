//! PostgreSQL import store for production use.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;

use crate::types::{
    Address, AddressId, AddressStatus, Campaign, CampaignId, Chain, ChainId, ChainOffer,
    ChainOfferId, NewAddress, NewCampaign, NewCampaignOffer, NewChainOffer, NewOffer,
    NewOfferSequence, NewPaymentMethod, Offer, OfferId, OfferSequence, PayeeName, PayeeNameId,
    PaymentMethod, PaymentMethodId, SequenceId,
};

use super::ImportStore;

/// Reference DDL for the tables this store drives.
///
/// `NULLS NOT DISTINCT` on the payment-method key makes the brandless
/// rows the import writes collide properly (PostgreSQL 15+).
pub const IMPORT_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS offers (
    id          BIGSERIAL PRIMARY KEY,
    title       TEXT NOT NULL,
    type        TEXT,
    description TEXT,
    porter      TEXT,
    owner       TEXT,
    theme       TEXT,
    grade       TEXT,
    country     TEXT,
    language    TEXT,
    version     TEXT,
    origin      TEXT
);

CREATE TABLE IF NOT EXISTS chains (
    id               BIGSERIAL PRIMARY KEY,
    title            TEXT NOT NULL,
    root_sequence_id BIGINT
);

CREATE TABLE IF NOT EXISTS offer_sequences (
    id               BIGSERIAL PRIMARY KEY,
    chain_id         BIGINT NOT NULL REFERENCES chains(id),
    current_offer_id BIGINT NOT NULL REFERENCES offers(id),
    next_offer_id    BIGINT REFERENCES offers(id),
    days_to_add      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS chain_offers (
    id       BIGSERIAL PRIMARY KEY,
    chain_id BIGINT NOT NULL REFERENCES chains(id),
    offer_id BIGINT NOT NULL REFERENCES offers(id),
    index    INTEGER NOT NULL,
    UNIQUE (chain_id, offer_id)
);

CREATE TABLE IF NOT EXISTS addresses (
    id       BIGSERIAL PRIMARY KEY,
    address  TEXT NOT NULL UNIQUE,
    country  TEXT,
    warning1 TEXT,
    warning2 TEXT,
    status   TEXT NOT NULL DEFAULT 'normal'
);

CREATE TABLE IF NOT EXISTS payee_names (
    id   BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS payment_methods (
    id       BIGSERIAL PRIMARY KEY,
    country  TEXT NOT NULL,
    brand_id BIGINT,
    methods  TEXT[] NOT NULL DEFAULT '{cash}',
    UNIQUE NULLS NOT DISTINCT (country, brand_id)
);

CREATE TABLE IF NOT EXISTS campaigns (
    id            BIGSERIAL PRIMARY KEY,
    code          TEXT NOT NULL,
    country       TEXT,
    chain_id      BIGINT NOT NULL REFERENCES chains(id),
    mail_quantity BIGINT,
    mail_date     DATE,
    is_extracted  BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS campaign_offers (
    id                BIGSERIAL PRIMARY KEY,
    campaign_id       BIGINT NOT NULL REFERENCES campaigns(id),
    offer_id          BIGINT NOT NULL REFERENCES offers(id),
    payee_name_id     BIGINT REFERENCES payee_names(id) ON DELETE SET NULL,
    return_address_id BIGINT REFERENCES addresses(id),
    printer           TEXT,
    currency          TEXT NOT NULL,
    fixed_cost        BIGINT NOT NULL DEFAULT 0
);
"#;

/// Configuration for the PostgreSQL connection pool.
///
/// Defaults balance pool size against managed-database connection
/// limits; timeouts are aggressive to fail fast.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with production
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/fulfillment".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Error type for the PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// PostgreSQL import store.
pub struct PostgresImportStore {
    pool: PgPool,
}

impl PostgresImportStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Get the connection pool for health checks.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database is reachable.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    fn parse_offer_row(row: &PgRow) -> Result<Offer, sqlx::Error> {
        Ok(Offer {
            id: OfferId::new(row.try_get("id")?),
            title: row.try_get("title")?,
            offer_type: row.try_get("type")?,
            description: row.try_get("description")?,
            porter: row.try_get("porter")?,
            owner: row.try_get("owner")?,
            theme: row.try_get("theme")?,
            grade: row.try_get("grade")?,
            country: row.try_get("country")?,
            language: row.try_get("language")?,
            version: row.try_get("version")?,
            origin: row.try_get("origin")?,
        })
    }

    fn parse_chain_row(row: &PgRow) -> Result<Chain, sqlx::Error> {
        let root: Option<i64> = row.try_get("root_sequence_id")?;
        Ok(Chain {
            id: ChainId::new(row.try_get("id")?),
            title: row.try_get("title")?,
            root_sequence_id: root.map(SequenceId::new),
        })
    }

    fn parse_address_row(row: &PgRow) -> Result<Address, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Address {
            id: AddressId::new(row.try_get("id")?),
            text: row.try_get("address")?,
            country: row.try_get("country")?,
            warning1: row.try_get("warning1")?,
            warning2: row.try_get("warning2")?,
            status: status.parse().unwrap_or(AddressStatus::Normal),
        })
    }
}

/// Transaction handle used by the PostgreSQL store.
pub type PgTx = sqlx::Transaction<'static, sqlx::Postgres>;

#[async_trait]
impl ImportStore for PostgresImportStore {
    type Error = PostgresError;
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, PostgresError> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: PgTx) -> Result<(), PostgresError> {
        Ok(tx.commit().await?)
    }

    async fn rollback(&self, tx: PgTx) -> Result<(), PostgresError> {
        Ok(tx.rollback().await?)
    }

    async fn create_offers(
        &self,
        tx: &mut PgTx,
        offers: Vec<NewOffer>,
    ) -> Result<Vec<Offer>, PostgresError> {
        let mut created = Vec::with_capacity(offers.len());
        for offer in offers {
            let row = sqlx::query(
                r#"
                INSERT INTO offers
                    (title, type, description, porter, owner, theme, grade,
                     country, language, version, origin)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING id, title, type, description, porter, owner, theme,
                          grade, country, language, version, origin
                "#,
            )
            .bind(&offer.title)
            .bind(&offer.offer_type)
            .bind(&offer.description)
            .bind(&offer.porter)
            .bind(&offer.owner)
            .bind(&offer.theme)
            .bind(&offer.grade)
            .bind(&offer.country)
            .bind(&offer.language)
            .bind(&offer.version)
            .bind(&offer.origin)
            .fetch_one(&mut **tx)
            .await?;
            created.push(Self::parse_offer_row(&row)?);
        }
        Ok(created)
    }

    async fn create_chain(&self, tx: &mut PgTx, title: &str) -> Result<Chain, PostgresError> {
        let row = sqlx::query(
            r#"
            INSERT INTO chains (title, root_sequence_id)
            VALUES ($1, NULL)
            RETURNING id, title, root_sequence_id
            "#,
        )
        .bind(title)
        .fetch_one(&mut **tx)
        .await?;
        Ok(Self::parse_chain_row(&row)?)
    }

    async fn set_chain_root(
        &self,
        tx: &mut PgTx,
        chain_id: ChainId,
        root: SequenceId,
    ) -> Result<(), PostgresError> {
        sqlx::query("UPDATE chains SET root_sequence_id = $2 WHERE id = $1")
            .bind(chain_id.as_i64())
            .bind(root.as_i64())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn create_sequences(
        &self,
        tx: &mut PgTx,
        sequences: Vec<NewOfferSequence>,
    ) -> Result<Vec<OfferSequence>, PostgresError> {
        let mut created = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            let row = sqlx::query(
                r#"
                INSERT INTO offer_sequences
                    (chain_id, current_offer_id, next_offer_id, days_to_add)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(sequence.chain_id.as_i64())
            .bind(sequence.current_offer_id.as_i64())
            .bind(sequence.next_offer_id.map(|id| id.as_i64()))
            .bind(sequence.days_to_add)
            .fetch_one(&mut **tx)
            .await?;
            let id: i64 = row.try_get("id")?;
            created.push(OfferSequence::from_new(SequenceId::new(id), sequence));
        }
        Ok(created)
    }

    async fn create_chain_offers(
        &self,
        tx: &mut PgTx,
        chain_offers: Vec<NewChainOffer>,
    ) -> Result<Vec<ChainOffer>, PostgresError> {
        let mut created = Vec::with_capacity(chain_offers.len());
        for chain_offer in chain_offers {
            let row = sqlx::query(
                r#"
                INSERT INTO chain_offers (chain_id, offer_id, index)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(chain_offer.chain_id.as_i64())
            .bind(chain_offer.offer_id.as_i64())
            .bind(chain_offer.index)
            .fetch_one(&mut **tx)
            .await?;
            let id: i64 = row.try_get("id")?;
            created.push(ChainOffer::from_new(ChainOfferId::new(id), chain_offer));
        }
        Ok(created)
    }

    async fn find_chain_by_title(
        &self,
        tx: &mut PgTx,
        title: &str,
    ) -> Result<Option<Chain>, PostgresError> {
        let row = sqlx::query(
            "SELECT id, title, root_sequence_id FROM chains WHERE title = $1 LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&mut **tx)
        .await?;
        match row {
            Some(ref r) => Ok(Some(Self::parse_chain_row(r)?)),
            None => Ok(None),
        }
    }

    async fn chain_offers_ordered(
        &self,
        tx: &mut PgTx,
        chain_id: ChainId,
    ) -> Result<Vec<ChainOffer>, PostgresError> {
        let rows = sqlx::query(
            r#"
            SELECT id, chain_id, offer_id, index
            FROM chain_offers
            WHERE chain_id = $1
            ORDER BY index ASC, id ASC
            "#,
        )
        .bind(chain_id.as_i64())
        .fetch_all(&mut **tx)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ChainOffer {
                    id: ChainOfferId::new(row.try_get("id")?),
                    chain_id: ChainId::new(row.try_get("chain_id")?),
                    offer_id: OfferId::new(row.try_get("offer_id")?),
                    index: row.try_get("index")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(PostgresError::from)
    }

    async fn upsert_address(
        &self,
        tx: &mut PgTx,
        address: NewAddress,
    ) -> Result<Address, PostgresError> {
        let row = sqlx::query(
            r#"
            INSERT INTO addresses (address, country, warning1, warning2, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (address) DO UPDATE SET
                country  = EXCLUDED.country,
                warning1 = EXCLUDED.warning1,
                warning2 = EXCLUDED.warning2,
                status   = EXCLUDED.status
            RETURNING id, address, country, warning1, warning2, status
            "#,
        )
        .bind(address.text.trim())
        .bind(&address.country)
        .bind(&address.warning1)
        .bind(&address.warning2)
        .bind(address.status.as_str())
        .fetch_one(&mut **tx)
        .await?;
        Ok(Self::parse_address_row(&row)?)
    }

    async fn upsert_payee_name(
        &self,
        tx: &mut PgTx,
        name: &str,
    ) -> Result<PayeeName, PostgresError> {
        let row = sqlx::query(
            r#"
            INSERT INTO payee_names (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name.trim())
        .fetch_one(&mut **tx)
        .await?;
        Ok(PayeeName {
            id: PayeeNameId::new(row.try_get("id")?),
            name: row.try_get("name")?,
        })
    }

    async fn upsert_payment_method(
        &self,
        tx: &mut PgTx,
        method: NewPaymentMethod,
    ) -> Result<PaymentMethod, PostgresError> {
        let row = sqlx::query(
            r#"
            INSERT INTO payment_methods (country, brand_id, methods)
            VALUES ($1, $2, $3)
            ON CONFLICT (country, brand_id) DO UPDATE SET methods = EXCLUDED.methods
            RETURNING id, country, brand_id, methods
            "#,
        )
        .bind(&method.country)
        .bind(method.brand_id)
        .bind(&method.methods)
        .fetch_one(&mut **tx)
        .await?;
        Ok(PaymentMethod {
            id: PaymentMethodId::new(row.try_get("id")?),
            country: row.try_get("country")?,
            brand_id: row.try_get("brand_id")?,
            methods: row.try_get("methods")?,
        })
    }

    async fn create_campaign(
        &self,
        tx: &mut PgTx,
        campaign: NewCampaign,
    ) -> Result<Campaign, PostgresError> {
        let row = sqlx::query(
            r#"
            INSERT INTO campaigns
                (code, country, chain_id, mail_quantity, mail_date, is_extracted)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&campaign.code)
        .bind(&campaign.country)
        .bind(campaign.chain_id.as_i64())
        .bind(campaign.mail_quantity)
        .bind(campaign.mail_date)
        .bind(campaign.is_extracted)
        .fetch_one(&mut **tx)
        .await?;
        let id: i64 = row.try_get("id")?;
        Ok(Campaign::from_new(CampaignId::new(id), campaign))
    }

    async fn create_campaign_offers(
        &self,
        tx: &mut PgTx,
        campaign_offers: Vec<NewCampaignOffer>,
    ) -> Result<(), PostgresError> {
        for campaign_offer in campaign_offers {
            sqlx::query(
                r#"
                INSERT INTO campaign_offers
                    (campaign_id, offer_id, payee_name_id, return_address_id,
                     printer, currency, fixed_cost)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(campaign_offer.campaign_id.as_i64())
            .bind(campaign_offer.offer_id.as_i64())
            .bind(campaign_offer.payee_name_id.map(|id| id.as_i64()))
            .bind(campaign_offer.return_address_id.map(|id| id.as_i64()))
            .bind(&campaign_offer.printer)
            .bind(&campaign_offer.currency)
            .bind(campaign_offer.fixed_cost)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}
