pub mod app;
pub mod events;
pub mod palette;
pub mod ui;

pub use app::{App, AppConfig};
