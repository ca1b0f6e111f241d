mod data_host;

pub use data_host::DataHost;
