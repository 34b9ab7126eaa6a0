use crate::domain::{
    Campaign, CampaignMessage, CampaignState, CampaignStats, CampaignStatus, OwnerId,
    PersonName, Subscriber, SubscriberEmail, SubscriberState, SubscriberStatus, ValidationError,
};
use crate::lifecycle::{self, LifecycleError, SendOutcome};
use crate::store::{Store, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

type PgTransaction = sqlx::Transaction<'static, sqlx::Postgres>;

const CAMPAIGN_COLUMNS: &str =
    "id, owner_id, name, subject, content, status, created_at, scheduled_at, sent_at";
const SUBSCRIBER_COLUMNS: &str =
    "id, owner_id, email, first_name, last_name, tags, status, subscribed_at, unsubscribed_at";

pub struct PgStore {
    pg_pool: PgPool,
}

impl PgStore {
    pub fn new(pg_pool: PgPool) -> Self {
        Self { pg_pool }
    }

    #[tracing::instrument(name = "Run database migrations", skip(self))]
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pg_pool).await
    }
}

#[derive(sqlx::FromRow)]
struct CampaignRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    subject: String,
    content: String,
    status: String,
    created_at: DateTime<Utc>,
    scheduled_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = ValidationError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        Ok(Campaign {
            id: row.id,
            owner_id: OwnerId::new(row.owner_id),
            message: CampaignMessage::parse(row.name, row.subject, row.content)?,
            created_at: row.created_at,
            scheduled_at: row.scheduled_at,
            state: CampaignState::from_parts(CampaignStatus::parse(&row.status)?, row.sent_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    owner_id: Uuid,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    tags: Vec<String>,
    status: String,
    subscribed_at: DateTime<Utc>,
    unsubscribed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = ValidationError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        Ok(Subscriber {
            id: row.id,
            owner_id: OwnerId::new(row.owner_id),
            // Re-parse on read: validation rules may have changed since the row was written
            email: SubscriberEmail::parse(row.email)?,
            first_name: PersonName::parse_optional("first_name", row.first_name)?,
            last_name: PersonName::parse_optional("last_name", row.last_name)?,
            tags: row.tags.into_iter().collect(),
            subscribed_at: row.subscribed_at,
            state: SubscriberState::from_parts(
                SubscriberStatus::parse(&row.status)?,
                row.unsubscribed_at,
            )?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CampaignStatsRow {
    campaign_id: Uuid,
    total_sent: i64,
    total_delivered: i64,
    total_opened: i64,
    total_clicked: i64,
    total_bounced: i64,
    total_unsubscribed: i64,
    created_at: DateTime<Utc>,
}

fn counter(field: &'static str, value: i64) -> Result<u64, ValidationError> {
    u64::try_from(value).map_err(|_| ValidationError::new(field, "negative counter"))
}

fn to_column(field: &'static str, value: u64) -> Result<i64, ValidationError> {
    i64::try_from(value).map_err(|_| ValidationError::new(field, "counter overflow"))
}

impl TryFrom<CampaignStatsRow> for CampaignStats {
    type Error = ValidationError;

    fn try_from(row: CampaignStatsRow) -> Result<Self, Self::Error> {
        Ok(CampaignStats {
            campaign_id: row.campaign_id,
            total_sent: counter("total_sent", row.total_sent)?,
            total_delivered: counter("total_delivered", row.total_delivered)?,
            total_opened: counter("total_opened", row.total_opened)?,
            total_clicked: counter("total_clicked", row.total_clicked)?,
            total_bounced: counter("total_bounced", row.total_bounced)?,
            total_unsubscribed: counter("total_unsubscribed", row.total_unsubscribed)?,
            created_at: row.created_at,
        })
    }
}

fn into_domain<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = ValidationError>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(StoreError::from))
        .collect()
}

#[tracing::instrument(name = "Lock campaign for sending", skip(transaction))]
async fn lock_campaign(
    transaction: &mut PgTransaction,
    owner_id: OwnerId,
    campaign_id: Uuid,
) -> Result<Option<Campaign>, StoreError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {} FROM campaigns WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        CAMPAIGN_COLUMNS
    ))
    .bind(campaign_id)
    .bind(*owner_id)
    .fetch_optional(&mut *transaction)
    .await?;

    Ok(row.map(Campaign::try_from).transpose()?)
}

#[tracing::instrument(name = "Load active subscribers for sending", skip(transaction))]
async fn active_subscribers(
    transaction: &mut PgTransaction,
    owner_id: OwnerId,
) -> Result<Vec<Subscriber>, StoreError> {
    let rows = sqlx::query_as::<_, SubscriberRow>(&format!(
        "SELECT {} FROM subscribers WHERE owner_id = $1 AND status = $2",
        SUBSCRIBER_COLUMNS
    ))
    .bind(*owner_id)
    .bind(SubscriberStatus::Active.as_ref())
    .fetch_all(&mut *transaction)
    .await?;

    into_domain(rows)
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(name = "Load campaigns from database", skip(self))]
    async fn load_campaigns(&self, owner_id: OwnerId) -> Result<Vec<Campaign>, StoreError> {
        let rows = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {} FROM campaigns WHERE owner_id = $1 ORDER BY created_at DESC",
            CAMPAIGN_COLUMNS
        ))
        .bind(*owner_id)
        .fetch_all(&self.pg_pool)
        .await?;

        into_domain(rows)
    }

    #[tracing::instrument(name = "Load subscribers from database", skip(self))]
    async fn load_subscribers(&self, owner_id: OwnerId) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(&format!(
            "SELECT {} FROM subscribers WHERE owner_id = $1 ORDER BY subscribed_at DESC",
            SUBSCRIBER_COLUMNS
        ))
        .bind(*owner_id)
        .fetch_all(&self.pg_pool)
        .await?;

        into_domain(rows)
    }

    #[tracing::instrument(name = "Load campaign stats from database", skip(self, campaign_ids))]
    async fn load_campaign_stats(
        &self,
        campaign_ids: &[Uuid],
    ) -> Result<Vec<CampaignStats>, StoreError> {
        if campaign_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, CampaignStatsRow>(
            r#"
            SELECT campaign_id, total_sent, total_delivered, total_opened, total_clicked,
                total_bounced, total_unsubscribed, created_at
            FROM campaign_stats
            WHERE campaign_id = ANY($1)
            "#,
        )
        .bind(campaign_ids.to_vec())
        .fetch_all(&self.pg_pool)
        .await?;

        into_domain(rows)
    }

    #[tracing::instrument(
        name = "Insert campaign into database",
        skip(self, campaign),
        fields(campaign_id = %campaign.id)
    )]
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO campaigns
                (id, owner_id, name, subject, content, status, created_at, scheduled_at, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(campaign.id)
        .bind(*campaign.owner_id)
        .bind(campaign.message.name())
        .bind(campaign.message.subject())
        .bind(campaign.message.content())
        .bind(campaign.status().as_ref())
        .bind(campaign.created_at)
        .bind(campaign.scheduled_at)
        .bind(campaign.state.sent_at())
        .execute(&self.pg_pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "Update campaign message in database",
        skip(self, campaign),
        fields(campaign_id = %campaign.id)
    )]
    async fn update_campaign_message(&self, campaign: &Campaign) -> Result<Campaign, StoreError> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            UPDATE campaigns
            SET name = $3, subject = $4, content = $5, updated_at = now()
            WHERE id = $1 AND owner_id = $2 AND status <> $6
            RETURNING {}
            "#,
            CAMPAIGN_COLUMNS
        ))
        .bind(campaign.id)
        .bind(*campaign.owner_id)
        .bind(campaign.message.name())
        .bind(campaign.message.subject())
        .bind(campaign.message.content())
        .bind(CampaignStatus::Sent.as_ref())
        .fetch_optional(&self.pg_pool)
        .await?
        .ok_or(StoreError::StaleWrite)?;

        Ok(Campaign::try_from(row)?)
    }

    #[tracing::instrument(
        name = "Update campaign schedule in database",
        skip(self, campaign),
        fields(campaign_id = %campaign.id, status = %campaign.status().as_ref())
    )]
    async fn update_campaign_schedule(
        &self,
        campaign: &Campaign,
    ) -> Result<Campaign, StoreError> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            UPDATE campaigns
            SET status = $3, scheduled_at = $4, updated_at = now()
            WHERE id = $1 AND owner_id = $2 AND status <> $5
            RETURNING {}
            "#,
            CAMPAIGN_COLUMNS
        ))
        .bind(campaign.id)
        .bind(*campaign.owner_id)
        .bind(campaign.status().as_ref())
        .bind(campaign.scheduled_at)
        .bind(CampaignStatus::Sent.as_ref())
        .fetch_optional(&self.pg_pool)
        .await?
        .ok_or(StoreError::StaleWrite)?;

        Ok(Campaign::try_from(row)?)
    }

    #[tracing::instrument(name = "Send campaign in database", skip(self))]
    async fn send_campaign(
        &self,
        owner_id: OwnerId,
        campaign_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SendOutcome, StoreError> {
        let mut transaction = self.pg_pool.begin().await?;

        // The row lock makes concurrent edits and sends wait until we commit
        let campaign = lock_campaign(&mut transaction, owner_id, campaign_id)
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "campaign",
                id: campaign_id,
            })?;
        let subscribers = active_subscribers(&mut transaction, owner_id).await?;
        let outcome = lifecycle::send_campaign(&campaign, &subscribers, now)?;

        sqlx::query(
            r#"
            UPDATE campaigns
            SET status = $3, sent_at = $4, updated_at = now()
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(campaign_id)
        .bind(*owner_id)
        .bind(outcome.campaign.status().as_ref())
        .bind(outcome.campaign.state.sent_at())
        .execute(&mut transaction)
        .await?;
        transaction.commit().await?;

        Ok(outcome)
    }

    #[tracing::instrument(name = "Delete campaign from database", skip(self))]
    async fn delete_campaign(&self, owner_id: OwnerId, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(r#"DELETE FROM campaigns WHERE id = $1 AND owner_id = $2"#)
            .bind(id)
            .bind(*owner_id)
            .execute(&self.pg_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[tracing::instrument(
        name = "Insert campaign stats into database",
        skip(self, stats),
        fields(campaign_id = %stats.campaign_id, total_sent = stats.total_sent)
    )]
    async fn insert_campaign_stats(&self, stats: &CampaignStats) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO campaign_stats
                (id, campaign_id, total_sent, total_delivered, total_opened, total_clicked,
                 total_bounced, total_unsubscribed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(stats.campaign_id)
        .bind(to_column("total_sent", stats.total_sent)?)
        .bind(to_column("total_delivered", stats.total_delivered)?)
        .bind(to_column("total_opened", stats.total_opened)?)
        .bind(to_column("total_clicked", stats.total_clicked)?)
        .bind(to_column("total_bounced", stats.total_bounced)?)
        .bind(to_column("total_unsubscribed", stats.total_unsubscribed)?)
        .bind(stats.created_at)
        .execute(&self.pg_pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "Insert subscriber into database",
        skip(self, subscriber),
        fields(subscriber_id = %subscriber.id)
    )]
    async fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO subscribers
                (id, owner_id, email, first_name, last_name, tags, status,
                 subscribed_at, unsubscribed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(subscriber.id)
        .bind(*subscriber.owner_id)
        .bind(subscriber.email.as_ref())
        .bind(subscriber.first_name.as_ref().map(|n| n.as_ref().to_string()))
        .bind(subscriber.last_name.as_ref().map(|n| n.as_ref().to_string()))
        .bind(subscriber.tags.iter().cloned().collect::<Vec<String>>())
        .bind(subscriber.status().as_ref())
        .bind(subscriber.subscribed_at)
        .bind(subscriber.state.unsubscribed_at())
        .execute(&self.pg_pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "Update subscriber profile in database",
        skip(self, subscriber),
        fields(subscriber_id = %subscriber.id)
    )]
    async fn update_subscriber_profile(
        &self,
        subscriber: &Subscriber,
    ) -> Result<Subscriber, StoreError> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            r#"
            UPDATE subscribers
            SET email = $3, first_name = $4, last_name = $5, tags = $6
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            SUBSCRIBER_COLUMNS
        ))
        .bind(subscriber.id)
        .bind(*subscriber.owner_id)
        .bind(subscriber.email.as_ref())
        .bind(subscriber.first_name.as_ref().map(|n| n.as_ref().to_string()))
        .bind(subscriber.last_name.as_ref().map(|n| n.as_ref().to_string()))
        .bind(subscriber.tags.iter().cloned().collect::<Vec<String>>())
        .fetch_optional(&self.pg_pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(Subscriber::try_from(row)?)
    }

    #[tracing::instrument(
        name = "Mark subscriber as unsubscribed in database",
        skip(self, subscriber),
        fields(subscriber_id = %subscriber.id)
    )]
    async fn mark_unsubscribed(&self, subscriber: &Subscriber) -> Result<bool, StoreError> {
        let unsubscribed_at = match subscriber.state.unsubscribed_at() {
            Some(unsubscribed_at) => unsubscribed_at,
            None => return Ok(false),
        };
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET status = $3, unsubscribed_at = $4
            WHERE id = $1 AND owner_id = $2 AND status = $5
            "#,
        )
        .bind(subscriber.id)
        .bind(*subscriber.owner_id)
        .bind(SubscriberStatus::Unsubscribed.as_ref())
        .bind(unsubscribed_at)
        .bind(SubscriberStatus::Active.as_ref())
        .execute(&self.pg_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(name = "Delete subscriber from database", skip(self))]
    async fn delete_subscriber(&self, owner_id: OwnerId, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(r#"DELETE FROM subscribers WHERE id = $1 AND owner_id = $2"#)
            .bind(id)
            .bind(*owner_id)
            .execute(&self.pg_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
