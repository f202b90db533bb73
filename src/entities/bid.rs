use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub job_id: Uuid,
    pub truck_id: String,
    pub price: f64,
}

impl Bid {
    pub fn new(job_id: Uuid, truck_id: String, price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            job_id,
            truck_id,
            price,
        }
    }
}
