pub mod domain_repo;
pub mod proxy_repo;
pub mod subscriber_repo;

pub use domain_repo::DomainRepository;
pub use proxy_repo::ProxyRepository;
pub use subscriber_repo::SubscriberRepository;
