//! Server-side view of the browser session: cookie presence and the page guard.

mod cookie;
mod guard;

pub use cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, SessionCookies, get_cookie};
pub use guard::{APP_HOME, GuardDecision, LOGIN_PAGE, decide, guard_pages};
