pub mod session;

pub use session::{resolve_session, Claims, Session, SessionVerifier};
