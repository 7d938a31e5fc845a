pub mod count;
pub mod ingest;
pub mod token;
