//! Buffered XML writer with minimal allocations

use std::io::Write;

use crate::error::Result;

/// Append `text` to `buf` with the five XML entities escaped.
pub(crate) fn escape_into(buf: &mut Vec<u8>, text: &str) {
    for byte in text.bytes() {
        match byte {
            b'&' => buf.extend_from_slice(b"&amp;"),
            b'<' => buf.extend_from_slice(b"&lt;"),
            b'>' => buf.extend_from_slice(b"&gt;"),
            b'"' => buf.extend_from_slice(b"&quot;"),
            b'\'' => buf.extend_from_slice(b"&apos;"),
            _ => buf.push(byte),
        }
    }
}

/// XML writer that batches small writes into one buffer
pub struct XmlWriter<W: Write> {
    writer: W,
    buffer: Vec<u8>,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(writer: W) -> Self {
        XmlWriter {
            writer,
            buffer: Vec::with_capacity(8192),
        }
    }

    /// Write raw bytes directly
    #[inline]
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > 4096 {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Write string data
    #[inline]
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_raw(s.as_bytes())
    }

    /// Write XML element start tag (left open for attributes)
    #[inline]
    pub fn start_element(&mut self, name: &str) -> Result<()> {
        self.write_raw(b"<")?;
        self.write_str(name)
    }

    /// Write XML element end tag
    #[inline]
    pub fn end_element(&mut self, name: &str) -> Result<()> {
        self.write_raw(b"</")?;
        self.write_str(name)?;
        self.write_raw(b">")
    }

    /// Write attribute with escaped value
    #[inline]
    pub fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.write_raw(b" ")?;
        self.write_str(name)?;
        self.write_raw(b"=\"")?;
        let mut escaped = Vec::with_capacity(value.len());
        escape_into(&mut escaped, value);
        self.write_raw(&escaped)?;
        self.write_raw(b"\"")
    }

    /// Write attribute with integer value
    #[inline]
    pub fn attribute_int(&mut self, name: &str, value: i64) -> Result<()> {
        self.write_raw(b" ")?;
        self.write_str(name)?;
        self.write_raw(b"=\"")?;
        let mut digits = itoa::Buffer::new();
        self.write_str(digits.format(value))?;
        self.write_raw(b"\"")
    }

    /// Close a start tag opened with `start_element`
    #[inline]
    pub fn close_start_tag(&mut self) -> Result<()> {
        self.write_raw(b">")
    }

    /// Close a start tag as a self-closing element
    #[inline]
    pub fn close_empty_tag(&mut self) -> Result<()> {
        self.write_raw(b"/>")
    }

    /// Write text content with XML escaping
    #[inline]
    pub fn write_escaped(&mut self, text: &str) -> Result<()> {
        let mut escaped = Vec::with_capacity(text.len());
        escape_into(&mut escaped, text);
        self.write_raw(&escaped)
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    /// Flush buffer and the underlying writer
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buffer()?;
        self.writer.flush()?;
        Ok(())
    }
}
