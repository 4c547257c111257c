//! Rendering backends for slide decks.
//!
//! A backend turns a segmented [`lectern_doc::Deck`] and its attribute set
//! into one static markup page. Backends are looked up by name through a
//! [`BackendRegistry`].

pub mod html5;
pub mod markdown;
pub mod registry;
pub mod revealjs;
pub mod traits;

pub use html5::Html5Backend;
pub use registry::{BackendRegistry, DEFAULT_BACKEND};
pub use revealjs::RevealJsBackend;
pub use traits::{Backend, BackendError, RenderedSlide};
