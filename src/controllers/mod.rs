pub mod home_controller;
pub mod alerts_controller;
pub mod search_controller;
pub mod status_controller;
pub mod user_controller;
pub mod realtime_controller;
