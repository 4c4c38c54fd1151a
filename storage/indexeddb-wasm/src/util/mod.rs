pub mod cb_future;
pub mod cb_race;
pub mod cb_stream;
pub mod require;
