//! Media module for manifests, transfer units and naming.

pub mod item;
pub mod manifest;
pub mod naming;

pub use item::{MediaKind, NamedBlob, TransferUnit};
pub use manifest::{Author, Envelope, ImageRef, MediaManifest};
pub use naming::{derive_filename, sanitize_folder_segment};
