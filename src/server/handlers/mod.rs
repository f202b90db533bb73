pub mod bids;
pub mod board;
pub mod jobs;
