pub mod ingestion;
pub mod rest;
