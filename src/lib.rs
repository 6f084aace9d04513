pub mod api;
pub mod config;
pub mod efficiency;
pub mod games;
pub mod http_client;
pub mod pipeline;
pub mod season_cache;
pub mod stats_fetch;
pub mod teams;
pub mod wide_table;

pub type Season = u16;
