//! Mock, chaos, and breakpoint rule engines for the DebugProbe agent.
//!
//! Each engine owns one [`store::RuleStore`] of its rule type and
//! implements the matching `debugprobe_kernel` callback trait, so the
//! facade crate can install them directly into the kernel's
//! [`debugprobe_kernel::EventBus`].

pub mod breakpoint;
pub mod chaos;
pub mod mock;
pub mod store;
pub mod url_match;

pub use breakpoint::{BreakpointEngine, BreakpointResume};
pub use chaos::ChaosEngine;
pub use mock::MockEngine;
pub use store::RuleStore;
