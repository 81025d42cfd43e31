pub mod json;

pub use json::{iso_now, JsonFormatter, SignalReadingJson};
