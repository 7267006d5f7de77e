/*!
 * Network ASCII line-ending translation
 *
 * Text-mode transfers carry CRLF line endings on the wire. `FromNetAscii`
 * turns them into the local separator while reading; `ToNetAscii` does the
 * reverse while writing.
 */

use std::io::{self, Read, Write};

/// How a transfer's bytes are interpreted on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// Bytes are copied untouched
    #[default]
    Binary,
    /// Line endings are translated between CRLF and the local separator
    Ascii,
}

/// True when the platform line separator already is CRLF
const LOCAL_SEPARATOR_IS_CRLF: bool = cfg!(windows);

/// Reader adapter converting CRLF to LF
pub struct FromNetAscii<R> {
    inner: R,
    passthrough: bool,
    pending_cr: bool,
    stash: Option<u8>,
    scratch: Vec<u8>,
}

impl<R: Read> FromNetAscii<R> {
    /// Translate only where the local separator differs from CRLF
    pub fn new(inner: R) -> Self {
        Self::with_passthrough(inner, LOCAL_SEPARATOR_IS_CRLF)
    }

    /// Always translate, regardless of platform
    pub fn converting(inner: R) -> Self {
        Self::with_passthrough(inner, false)
    }

    fn with_passthrough(inner: R, passthrough: bool) -> Self {
        Self {
            inner,
            passthrough,
            pending_cr: false,
            stash: None,
            scratch: Vec::new(),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for FromNetAscii<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.passthrough || buf.is_empty() {
            return self.inner.read(buf);
        }

        if let Some(byte) = self.stash.take() {
            buf[0] = byte;
            return Ok(1);
        }

        loop {
            // A CR held back from the previous read may expand into two bytes
            let want = if self.pending_cr {
                buf.len().saturating_sub(1).max(1)
            } else {
                buf.len()
            };
            self.scratch.resize(want, 0);

            let n = self.inner.read(&mut self.scratch[..want])?;
            if n == 0 {
                if self.pending_cr {
                    self.pending_cr = false;
                    buf[0] = b'\r';
                    return Ok(1);
                }
                return Ok(0);
            }

            let mut written = 0;
            for &byte in &self.scratch[..n] {
                if self.pending_cr {
                    self.pending_cr = false;
                    if byte == b'\n' {
                        buf[written] = b'\n';
                        written += 1;
                        continue;
                    }
                    buf[written] = b'\r';
                    written += 1;
                }

                if byte == b'\r' {
                    self.pending_cr = true;
                } else if written < buf.len() {
                    buf[written] = byte;
                    written += 1;
                } else {
                    self.stash = Some(byte);
                }
            }

            // Only a lone CR was read; Ok(0) would signal end of stream
            if written > 0 {
                return Ok(written);
            }
        }
    }
}

/// Writer adapter converting bare LF to CRLF
pub struct ToNetAscii<W> {
    inner: W,
    last_was_cr: bool,
}

impl<W: Write> ToNetAscii<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            last_was_cr: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ToNetAscii<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut encoded = Vec::with_capacity(buf.len() + buf.len() / 16 + 1);
        for &byte in buf {
            if byte == b'\n' && !self.last_was_cr {
                encoded.push(b'\r');
            }
            encoded.push(byte);
            self.last_was_cr = byte == b'\r';
        }
        self.inner.write_all(&encoded)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
