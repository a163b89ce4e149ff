pub mod device;
pub mod user;

pub use device::{Device, Frequency, NewDevice, NotificationSettings};
pub use user::User;
