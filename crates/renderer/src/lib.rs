//! Off-screen renderer for reactive UI components.
//!
//! A host runtime renders components into frames and reports changes as
//! render batches. The renderer applies those batches to a live
//! [`tessera_dom::Document`], lets tests query it with CSS selectors,
//! raise events on it, and compare it against expected markup with the
//! semantic diff engine.

pub mod bridge;
pub mod dispatcher;
pub mod error;
pub mod fragment;
pub mod options;
pub mod patcher;
pub mod projector;
pub mod renderer;

pub use bridge::{dispatch_event, EventDispatch};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, MarkupMismatch, PatchError, ProjectionError, RenderError};
pub use fragment::{RenderedFragment, Snapshot};
pub use options::RendererOptions;
pub use patcher::{HandlerRegistration, Patcher};
pub use projector::{
    project_attribute, project_component, projected_names, ProjectedAttribute,
    ELEMENT_REFERENCE_ATTRIBUTE, FRAMEWORK_PREFIX,
};
pub use renderer::{Phase, RenderCounter, RenderTask, Renderer, UnhandledException};
