pub mod api;
pub mod cms;
pub mod config;
pub mod edge;
pub mod flags;
pub mod identity;
pub mod metrics_consts;
pub mod pages;
pub mod prometheus;
pub mod render;
pub mod router;
pub mod server;
