use async_trait::async_trait;
use sqlx::Executor;
use uuid::Uuid;

use super::Engine;

use crate::{api::BidAPI, entities::Bid, error::Error, identity::SessionIdentity};

#[async_trait]
impl BidAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_bid(
        &self,
        identity: &SessionIdentity,
        job_id: Uuid,
        price: f64,
    ) -> Result<Bid, Error> {
        let bid = Bid::new(job_id, identity.token().into(), price);

        let mut conn = self.pool.acquire().await?;

        // the foreign key is the only existence check on job_id
        conn.execute(
            sqlx::query(
                "INSERT INTO bids (id, created_at, job_id, truck_id, price)
                VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&bid.id)
            .bind(&bid.created_at)
            .bind(&bid.job_id)
            .bind(&bid.truck_id)
            .bind(bid.price),
        )
        .await?;

        Ok(bid)
    }
}
