pub mod creative;
pub mod placements;

pub use creative::{BannerSize, Creative, CreativeInfo, CreativePayload, NativeAssets, Reward};
pub use placements::{AdFormat, Floor, PlacementKey, UnitId, WaterfallEntry};
