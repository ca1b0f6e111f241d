mod client;

pub use client::StaticDataClient;
