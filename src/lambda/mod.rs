// src/lambda/mod.rs

//! AWS Lambda handlers.
//!
//! - `ingest`: scheduled/HTTP trigger that runs one ingestion pass into S3
//! - `republish`: SQS trigger that uploads a stored image to Imgur

pub mod ingest;
pub mod republish;
