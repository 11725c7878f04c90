//! Mock check providers.
//!
//! In-memory, fixture-backed implementations of the `CheckProvider`
//! capability, simulating the external identity/income/fraud APIs the engine
//! delegates to in production. Responses are fully deterministic: the same
//! application always yields the same results, which is what the engine's
//! idempotence guarantee is tested against.

pub mod fixtures;
pub mod mock;

pub use mock::MockCheckProvider;
