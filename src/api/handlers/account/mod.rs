pub mod create;
pub mod login;
pub mod storage;
pub mod types;
pub mod verify;

pub use self::create::{create, salt, totp};
pub use self::login::login;
