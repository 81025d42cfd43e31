pub mod health;
pub mod rx_signal;

pub use health::health;
pub use rx_signal::handle_rx_signal;
