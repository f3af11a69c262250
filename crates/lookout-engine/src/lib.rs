//! lookout-engine
//!
//! Client-side search state synchronization: the query store, the debounced
//! request dispatcher, the monotonic result reconciler and the facet/hit
//! presenters, plus the session that wires them and its async driver.

pub mod debounce;
pub mod dispatcher;
pub mod driver;
pub mod facets;
pub mod hits;
pub mod observable;
pub mod reconciler;
pub mod session;
pub mod store;

pub use driver::{spawn, SessionHandle};
pub use reconciler::Verdict;
pub use session::{Action, Dispatch, Phase, SearchSession};
