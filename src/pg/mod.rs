pub mod client;

pub use client::PgClient;
