// src/lib.rs

//! imgrelay library
//!
//! Collects trending subreddit images into object storage and republishes
//! selected images to Imgur.

pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
