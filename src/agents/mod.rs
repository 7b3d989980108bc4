//! The two text-producing agents and the ways style editing can be wired.
//!
//! - `EssayProducer`: topic -> essay
//! - `StyleEditor`: text -> style-improved text, either in-process
//!   (`LocalStyleEditor`) or through another agent (`RemoteStyleEditor`)

mod essay;
mod remote;
mod style;

pub use essay::{Essay, EssayProducer};
pub use remote::RemoteStyleEditor;
pub use style::{DisabledStyleEditor, LocalStyleEditor, StyleEdit, StyleEditor, StyleOutcome};
