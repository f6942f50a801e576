pub mod checker;
pub mod egress;
pub mod notification_service;
pub mod probe;
