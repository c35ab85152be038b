pub mod amount;
pub mod campaign;
pub mod config;
pub mod credential;
pub mod csv;
pub mod engine;
pub mod fraud;
pub mod model;
pub mod policy;
pub mod reward;
pub mod tier;

pub use amount::{Amount, Rate};
pub use config::EngineConfig;
pub use engine::{Engine, EngineError, Member};
pub use model::{MemberRef, PurchaseRequest, Receipt, Tender, Tier, Transaction};
