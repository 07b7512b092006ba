//! Boot 68k MPW tools into a flat 24-bit guest address space.
//!
//! - [`resource`] parses the tool's resource fork into typed records
//! - [`loader`] places the CODE segments and [`linker`] patches the jump table
//! - [`bootstrap`] writes CurApName and the MPW argument block
//! - [`toolbox`] runs the SANE traps the CPU core hands over
//!
//! Everything addresses guest memory through an owned [`GuestMemory`].

pub mod bootstrap;
pub mod error;
pub mod linker;
pub mod loader;
pub mod memory;
pub mod numeric;
pub mod options;
pub mod resource;
pub mod toolbox;

pub use error::{ConfigError, MpwError, Result};
pub use loader::{LoadedImage, load_executable};
pub use memory::GuestMemory;
pub use numeric::Extended;
