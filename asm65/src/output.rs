//! Output sinks for assembled code
//!
//! `Raw` writes bytes only, `C64` prefixes them with the little-endian load
//! address, and `Screen` writes a lowercase hex trace, one line per
//! instruction and one per data byte.

use std::io::{self, Read, Write};

use crate::codegen::Encoding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Screen,
    #[default]
    Raw,
    C64,
}

impl OutputFormat {
    /// File extension used when no output name is given.
    pub fn default_extension(self) -> &'static str {
        match self {
            OutputFormat::C64 => "prg",
            OutputFormat::Raw | OutputFormat::Screen => "bin",
        }
    }
}

pub struct Emitter<W: Write> {
    writer: W,
    format: OutputFormat,
    size: usize,
}

impl<W: Write> Emitter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            size: 0,
        }
    }

    /// Writes the format header, if any.
    pub fn begin(&mut self, start_address: u16) -> io::Result<()> {
        if self.format == OutputFormat::C64 {
            self.writer.write_all(&start_address.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn instruction(&mut self, address: i32, encoding: &Encoding) -> io::Result<()> {
        let bytes = encoding.bytes();
        if self.format == OutputFormat::Screen {
            let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
            writeln!(self.writer, "{:04x} {}", address, hex.join(" "))?;
        } else {
            self.writer.write_all(bytes)?;
        }
        self.size += bytes.len();
        Ok(())
    }

    pub fn data(&mut self, address: i32, bytes: &[u8]) -> io::Result<()> {
        if self.format == OutputFormat::Screen {
            for (offset, byte) in bytes.iter().enumerate() {
                writeln!(self.writer, "{:04x} {:02x}", address + offset as i32, byte)?;
            }
        } else {
            self.writer.write_all(bytes)?;
        }
        self.size += bytes.len();
        Ok(())
    }

    /// Zero bytes covering a forward origin change.
    pub fn fill(&mut self, count: usize) -> io::Result<()> {
        if self.format != OutputFormat::Screen {
            io::copy(&mut io::repeat(0).take(count as u64), &mut self.writer)?;
        }
        self.size += count;
        Ok(())
    }

    /// Bytes of code, data and fill emitted so far, header excluded.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
