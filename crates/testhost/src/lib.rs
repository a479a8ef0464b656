pub mod builder;
pub mod component;
pub mod diff;
pub mod host;
#[cfg(test)]
mod tests;

pub use builder::{AsyncHandler, BuiltFrames, Handler, RenderBuilder, SyncHandler};
pub use component::{Component, ComponentContext, FnComponent, LifecycleFuture};
pub use diff::diff_frames;
pub use host::TestHost;
