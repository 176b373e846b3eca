//! Client side of gencache.
//!
//! This crate provides the network fetch primitive and the cache worker
//! that decides, per intercepted request, whether to answer from the cache
//! or the network.

pub mod fetch;
pub mod worker;

pub use reqwest::{Method, header};

pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Fetcher};
pub use worker::{
    ActivationReport, InstallReport, Interception, Lifecycle, ResponseSource, ServiceWorker, WorkerConfig,
};
