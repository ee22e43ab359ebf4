pub mod coingecko;
pub mod poller;
pub mod seed;
pub mod types;
