pub mod principal;
pub mod session;

pub use self::principal::Principal;
pub use self::session::{require_session, SESSION_COOKIE_NAME};
