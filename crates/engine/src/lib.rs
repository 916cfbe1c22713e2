//! Shared-expense settlements.
//!
//! The crate stores settlements (participants, foreign currencies, purchased
//! items and who benefits from them) through [`Engine`] and splits their cost
//! with [`compute`]. Storage rows live in the public entity modules; the rest
//! of the API works with the resolved [`Settlement`] aggregate.

pub use aggregate::SettlementRows;
pub use calculator::{SettlementResult, SettlementResultDetail, compute};
pub use currencies::Currency;
pub use error::EngineError;
pub use items::{Item, ItemDraft};
pub use ops::{Engine, EngineBuilder, SettlementWatcher};
pub use participants::Participant;
pub use settlements::{Settlement, SettlementListItem};
pub use util::MAX_NATIVE_TOTAL;

mod aggregate;
pub mod benefited;
mod calculator;
pub mod currencies;
mod error;
pub mod items;
mod ops;
pub mod participants;
pub mod settlements;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
