// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fs::File;
use std::io::{self, Write};

/// An append-only byte stream that can be closed explicitly
pub trait Sink: Write + Send {
    /// Flush buffered data and release the underlying resource.
    ///
    /// Closing twice is not an error.
    fn close(&mut self) -> io::Result<()>;
}

impl Sink for File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
