pub mod classify;
pub mod config;
pub mod currency;
pub mod directory;
pub mod identity;
pub mod intent;
pub mod session;
pub mod store;
pub mod transfer;
pub mod wallet;
pub mod wallet_backend;
