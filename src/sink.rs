//! Incremental JSON output sink.
//!
//! Writes the output document as a single object holding named arrays, one
//! record at a time; no record list is ever buffered. The byte stream is
//! fully determined by the sequence of calls, so identical inputs produce
//! byte-identical output.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;

/// Incremental writer for one JSON object of named arrays.
pub struct JsonSink<W: Write> {
    writer: W,
    first_field: bool,
    first_record: bool,
}

impl<W: Write> JsonSink<W> {
    /// Create a sink over a writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            first_field: true,
            first_record: true,
        }
    }

    /// Open the output object.
    pub fn begin_document(&mut self) -> Result<()> {
        self.writer.write_all(b"{")?;
        Ok(())
    }

    /// Open a named array field.
    pub fn begin_array(&mut self, name: &str) -> Result<()> {
        if !self.first_field {
            self.writer.write_all(b",")?;
        }
        self.first_field = false;
        self.first_record = true;
        serde_json::to_writer(&mut self.writer, name)?;
        self.writer.write_all(b":[")?;
        Ok(())
    }

    /// Append one record to the open array.
    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()> {
        if !self.first_record {
            self.writer.write_all(b",")?;
        }
        self.first_record = false;
        serde_json::to_writer(&mut self.writer, record)?;
        Ok(())
    }

    /// Close the open array.
    pub fn end_array(&mut self) -> Result<()> {
        self.writer.write_all(b"]")?;
        Ok(())
    }

    /// Close the output object and flush.
    pub fn end_document(&mut self) -> Result<()> {
        self.writer.write_all(b"}")?;
        self.writer.flush()?;
        Ok(())
    }
}
