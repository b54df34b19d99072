//! Services that sit between storage and the segmentation engine

pub mod form;
pub mod format;
pub mod io;
pub mod preview;

pub use form::SelectionFields;
pub use format::OutputFormatHandler;
pub use io::ImageIOService;
pub use preview::PreviewEncoder;
