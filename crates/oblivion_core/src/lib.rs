//! Read-only decoding of Oblivion `.ess` save files.
//!
//! [`save::SaveGame`] walks a whole file; [`records`] holds the change-record
//! and created-record decoders, which can also be used on their own.

pub mod core_api;
pub mod layout;
pub mod reader;
pub mod records;
pub mod save;
