//! Local file system backend.

pub mod folder;
mod util;

pub use folder::{LocalFolder, LocalFolderOptions};
pub use util::{extension_of, has_extension, is_hidden};
