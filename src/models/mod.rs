pub mod reading;

pub use reading::SignalReading;
