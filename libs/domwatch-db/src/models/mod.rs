pub mod check_log;
pub mod domain;
pub mod proxy;
pub mod subscriber;

pub use check_log::CheckLog;
pub use domain::{Domain, DomainStatus};
pub use proxy::Proxy;
pub use subscriber::Subscriber;
