pub mod statichost;
