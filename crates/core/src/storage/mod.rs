pub mod catalog;
pub mod format;
pub mod naming;
pub mod time_series;
