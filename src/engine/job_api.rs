use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Executor, Row};
use uuid::Uuid;

use super::Engine;

use crate::{
    api::JobAPI,
    entities::{Bid, Job, JobDraft},
    error::Error,
    identity::SessionIdentity,
};

#[async_trait]
impl JobAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_jobs(&self) -> Result<Vec<Job>, Error> {
        let mut conn = self.pool.acquire().await?;

        let job_rows = conn
            .fetch_all(sqlx::query(
                "SELECT id, created_at, pickup, delivery, cargo, required_tons, client_id
                FROM jobs ORDER BY created_at DESC",
            ))
            .await?;

        // bids come back in stored order, so the first of a price tie is the
        // earliest one
        let bid_rows = conn
            .fetch_all(sqlx::query(
                "SELECT id, created_at, job_id, truck_id, price
                FROM bids ORDER BY created_at ASC, id ASC",
            ))
            .await?;

        let mut bids_by_job: HashMap<Uuid, Vec<Bid>> = HashMap::new();

        for row in bid_rows.iter() {
            let bid = Bid {
                id: row.try_get("id")?,
                created_at: row.try_get("created_at")?,
                job_id: row.try_get("job_id")?,
                truck_id: row.try_get("truck_id")?,
                price: row.try_get("price")?,
            };

            bids_by_job.entry(bid.job_id).or_default().push(bid);
        }

        let mut jobs = Vec::with_capacity(job_rows.len());

        for row in job_rows.iter() {
            let id: Uuid = row.try_get("id")?;

            jobs.push(Job {
                id,
                created_at: row.try_get("created_at")?,
                pickup: row.try_get("pickup")?,
                delivery: row.try_get("delivery")?,
                cargo: row.try_get("cargo")?,
                required_tons: row.try_get("required_tons")?,
                client_id: row.try_get("client_id")?,
                bids: bids_by_job.remove(&id).unwrap_or_default(),
            });
        }

        Ok(jobs)
    }

    #[tracing::instrument(skip(self))]
    async fn create_job(&self, identity: &SessionIdentity, draft: JobDraft) -> Result<Job, Error> {
        let job = Job::new(draft, identity.token().into());

        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query(
                "INSERT INTO jobs (id, created_at, pickup, delivery, cargo, required_tons, client_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&job.id)
            .bind(&job.created_at)
            .bind(&job.pickup)
            .bind(&job.delivery)
            .bind(&job.cargo)
            .bind(job.required_tons)
            .bind(&job.client_id),
        )
        .await?;

        Ok(job)
    }
}
