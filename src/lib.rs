// Crate root: declare modules and control visibility

// Instruction decoding
pub mod canonical;
pub mod decoder;
pub mod registers;
pub mod target;

// Presentation
pub mod branch_tree;
pub mod columns;
pub mod command_view;
pub mod formatter;
pub mod hex_view;
pub mod layout;
pub mod palette;
pub mod text_canvas;

// Memory and helper plumbing
pub mod debug;
pub mod disasm_serializer;
pub mod error;
pub mod helper_requests;
pub mod memory;
pub mod protocol;
pub mod request_handler;
pub mod transport;
pub mod utils;

// Re-export commonly used API from the library for binaries/tests
pub use command_view::{CommandView, Frame, ViewerTab};
pub use decoder::{Decoder, MipsDecoder};
pub use error::{DecodeError, OutOfRangeAddress, ViewError};
pub use formatter::{FormatOptions, FormattedRow, Formatter};
pub use layout::{DrawPrimitive, Geometry};
pub use memory::{Memory, RamImage, KSEG0};
