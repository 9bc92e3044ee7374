pub mod editor;
pub mod export;
pub mod preview;
pub mod session;
pub mod store;
