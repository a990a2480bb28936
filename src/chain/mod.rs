pub mod contracts;
pub mod liquidity_client;
pub mod pool;
pub mod providers;
pub mod registry;
pub mod state_reader;
