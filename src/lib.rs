//! nvpower - decode the power tables of NVIDIA VBIOS images
//!
//! The power ('P') BIT directory is a list of 16-bit pointers to versioned
//! sub-tables. [`parse_power`] walks the directory, then decodes the BOOST
//! and CSTEP tables it points to into owned record structures.

pub mod bit;
pub mod config;
pub mod directory;
pub mod errors;
pub mod image;
pub mod logger;
pub mod power;
pub mod render;
pub mod tables;

pub use directory::{resolve, walk, DirectoryLocation, ResolvedSlot, SubtableRef, TableKind};
pub use errors::{AppError, AppResult, PowerError, PowerResult};
pub use image::{Image, ImageAccessor};
pub use power::{parse_power, parse_power_with, PowerDirectory};
pub use tables::{DecodeOptions, TableState};
