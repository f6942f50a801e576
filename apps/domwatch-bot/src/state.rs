use std::sync::Arc;

use domwatch_db::repositories::{DomainRepository, ProxyRepository, SubscriberRepository};

use crate::services::checker::DomainChecker;

#[derive(Clone)]
pub struct AppState {
    pub domains: DomainRepository,
    pub proxies: ProxyRepository,
    pub subscribers: SubscriberRepository,
    pub checker: Arc<DomainChecker>,
}
