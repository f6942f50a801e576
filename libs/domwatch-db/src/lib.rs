pub mod db;
pub mod models;
pub mod normalize;
pub mod repositories;

pub use sqlx;

pub use db::{connect, init_schema};
