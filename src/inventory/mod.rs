pub mod backoff;
pub mod pool;
pub mod resolver;
pub mod slot;
pub mod waterfall;

pub use backoff::BackoffPolicy;
pub use pool::RandomPool;
pub use resolver::PlacementResolver;
pub use slot::{
    ExpiryTimer, FailureOutcome, FixedUnit, LoadTicket, Slot, SlotState, UnitSlot, UnitSource,
};
pub use waterfall::{Waterfall, WaterfallSlot, WaterfallSource};
