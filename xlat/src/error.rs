/* Copyright (C) 2018 Olivier Goffart <ogoffart@woboq.com>

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense,
and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so,
subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial
portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES
OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
*/

use thiserror::Error;

/// Structural failure while decoding a catalog.
///
/// Only problems that make the whole payload unusable end up here. Malformed
/// records inside an otherwise readable `.po` file are skipped and logged, and
/// a broken `Plural-Forms` header silently falls back to the default rule.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// The payload (or one string inside it) is not valid UTF-8.
    #[error("invalid utf-8 in {what}: {source}")]
    InvalidUtf8 {
        what: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },
    /// The first four bytes are not a gettext `.mo` magic number.
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    /// The `.mo` major revision is not one we can read.
    #[error("unsupported mo revision {0:#x}")]
    UnsupportedRevision(u32),
    /// A table or string descriptor points outside the buffer.
    #[error("{what} out of bounds (offset {offset}, length {length}, buffer {size})")]
    OutOfBounds {
        what: &'static str,
        offset: usize,
        length: usize,
        size: usize,
    },
    /// The buffer ends before the fixed header does.
    #[error("truncated catalog: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
    /// The file name has neither a `.po` nor a `.mo` extension.
    #[error("unknown catalog extension: {0}")]
    UnknownExtension(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
