pub mod alert;
pub mod dto;
pub mod notification;
pub mod user;

pub use alert::{Alert, AlertPatch};
pub use notification::Notification;
pub use user::CurrentUser;
