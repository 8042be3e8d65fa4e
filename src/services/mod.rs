// tabpilot services
// Services provide the timed behaviour (refresh, rotation), the popup view
// model, settings, and logging setup.

pub mod logging;
pub mod popup_view;
pub mod refresh_scheduler;
pub mod rotation_cycle;
pub mod settings_engine;
