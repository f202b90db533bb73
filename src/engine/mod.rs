mod bid_api;
mod feed_api;
mod job_api;

use sqlx::{Executor, Pool, Postgres};

use crate::api::API;
use crate::error::Error;

type Database = Postgres;

pub const CHANGE_CHANNEL: &str = "zedhaul_changes";

pub struct Engine {
    pool: Pool<Database>,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub async fn new(pool: Pool<Database>) -> Result<Self, Error> {
        pool.execute(
            "CREATE TABLE IF NOT EXISTS jobs (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                pickup VARCHAR NOT NULL,
                delivery VARCHAR NOT NULL,
                cargo VARCHAR NOT NULL,
                required_tons DOUBLE PRECISION NOT NULL CHECK (required_tons > 0),
                client_id VARCHAR NOT NULL
            )",
        )
        .await?;

        pool.execute(
            "CREATE TABLE IF NOT EXISTS bids (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                job_id UUID NOT NULL,
                truck_id VARCHAR NOT NULL,
                price DOUBLE PRECISION NOT NULL CHECK (price > 0),
                CONSTRAINT fk_bid_job FOREIGN KEY(job_id) REFERENCES jobs(id)
            )",
        )
        .await?;

        // every row change on either board table lands on one notify channel;
        // the payload names table and op for the logs
        pool.execute(
            "CREATE OR REPLACE FUNCTION notify_board_change() RETURNS trigger AS $$
            BEGIN
                PERFORM pg_notify('zedhaul_changes', TG_TABLE_NAME || ':' || TG_OP);
                RETURN NULL;
            END;
            $$ LANGUAGE plpgsql",
        )
        .await?;

        pool.execute("DROP TRIGGER IF EXISTS jobs_board_change ON jobs")
            .await?;
        pool.execute(
            "CREATE TRIGGER jobs_board_change AFTER INSERT OR UPDATE OR DELETE ON jobs
            FOR EACH ROW EXECUTE PROCEDURE notify_board_change()",
        )
        .await?;

        pool.execute("DROP TRIGGER IF EXISTS bids_board_change ON bids")
            .await?;
        pool.execute(
            "CREATE TRIGGER bids_board_change AFTER INSERT OR UPDATE OR DELETE ON bids
            FOR EACH ROW EXECUTE PROCEDURE notify_board_change()",
        )
        .await?;

        Ok(Self { pool })
    }
}

impl API for Engine {}
