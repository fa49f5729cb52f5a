pub mod cli;
pub mod collector_config;
pub mod config;
pub mod configurer;
pub mod destination;
pub mod gateway;
pub mod k8s;
pub mod logging;
pub mod processor;
pub mod sizing;
pub mod synthesis;
