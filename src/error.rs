// Copyright (c) 2026 MIPS-Memview Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for decoding, formatting and memory access.
//!
//! None of these are fatal to a frame. The command view turns every one of
//! them into a diagnostic row and carries on with the next instruction slot.

use std::error::Error;
use std::fmt;

/// The decoder could not make sense of a word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub word: u32,
    pub reason: String,
}

impl DecodeError {
    pub fn new(word: u32, reason: impl Into<String>) -> Self {
        Self {
            word,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:08x})", self.reason, self.word)
    }
}

impl Error for DecodeError {}

/// A read fell outside the memory the image backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRangeAddress {
    pub address: u32,
    pub width: u32,
}

impl fmt::Display for OutOfRangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "address 0x{:08x} (+{} bytes) is outside of memory",
            self.address, self.width
        )
    }
}

impl Error for OutOfRangeAddress {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    Decode(DecodeError),
    /// Decoded fine, but no formatting rule exists for the mnemonic.
    UnsupportedMnemonic { mnemonic: String },
    OutOfRange(OutOfRangeAddress),
    /// User supplied address expression did not parse.
    InvalidAddress(String),
    /// A write hit memory that cannot be modified, such as a mapped image.
    ReadOnly { address: u32 },
    /// A view option or row count is outside the range the views accept.
    InvalidOption(String),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::Decode(e) => write!(f, "decode error: {}", e),
            ViewError::UnsupportedMnemonic { mnemonic } => {
                write!(f, "no formatting rule for '{}'", mnemonic)
            }
            ViewError::OutOfRange(e) => write!(f, "{}", e),
            ViewError::InvalidAddress(s) => write!(f, "invalid address expression '{}'", s),
            ViewError::ReadOnly { address } => {
                write!(f, "memory at 0x{:08x} is read-only", address)
            }
            ViewError::InvalidOption(s) => write!(f, "invalid option: {}", s),
        }
    }
}

impl Error for ViewError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ViewError::Decode(e) => Some(e),
            ViewError::OutOfRange(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DecodeError> for ViewError {
    fn from(e: DecodeError) -> Self {
        ViewError::Decode(e)
    }
}

impl From<OutOfRangeAddress> for ViewError {
    fn from(e: OutOfRangeAddress) -> Self {
        ViewError::OutOfRange(e)
    }
}
