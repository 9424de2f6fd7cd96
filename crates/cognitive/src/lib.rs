//! The tutor's reasoning layer.
//!
//! `exchange` runs one bounded tool conversation with the provider,
//! `ooda` turns exchanges into a periodic observation loop, `triggers`
//! decides when to wake that loop early, and `pedagogy` supplies the
//! offline heuristics both of them lean on.

pub mod exchange;
pub mod ooda;
pub mod pedagogy;
pub mod triggers;

pub use exchange::{ExchangeReport, ToolExchange, ToolInvocation};
pub use ooda::{LoopConfig, LoopPhase, ToolOodaLoop};
pub use triggers::{TriggerDecision, TriggerDetector};
