pub mod activation_code;
pub mod user;

pub use activation_code::Entity as ActivationCode;
pub use user::Entity as User;
