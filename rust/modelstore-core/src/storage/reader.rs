// rust/modelstore-core/src/storage/reader.rs

//! Reading resolved objects.

use std::io::{Cursor, Read};

use bytes::Bytes;

use super::ObjectHandle;
use crate::error::{Result, ResultExt, StoreError};
use crate::table::{read_csv, Table, TableFormat};

/// How the content of an object should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Decode the bytes as UTF-8 text.
    pub decode_as_text: bool,
    /// Wrap the content in an in-memory reader.
    pub wrap_as_stream: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::text()
    }
}

impl ReadOptions {
    pub fn bytes() -> Self {
        Self {
            decode_as_text: false,
            wrap_as_stream: false,
        }
    }

    pub fn text() -> Self {
        Self {
            decode_as_text: true,
            wrap_as_stream: false,
        }
    }

    pub fn streamed(mut self) -> Self {
        self.wrap_as_stream = true;
        self
    }
}

/// Object content in one of four presentations.
#[derive(Debug)]
pub enum ObjectContent {
    Bytes(Bytes),
    Text(String),
    ByteStream(Cursor<Bytes>),
    TextStream(Cursor<String>),
}

impl ObjectContent {
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::ByteStream(_) | Self::TextStream(_))
    }

    /// The underlying bytes, whatever the presentation.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => Bytes::from(text),
            Self::ByteStream(cursor) => cursor.into_inner(),
            Self::TextStream(cursor) => Bytes::from(cursor.into_inner()),
        }
    }

    /// A reader over the content, starting at its current position.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            Self::Bytes(bytes) => Box::new(Cursor::new(bytes)),
            Self::Text(text) => Box::new(Cursor::new(text.into_bytes())),
            Self::ByteStream(cursor) => Box::new(cursor),
            Self::TextStream(cursor) => Box::new(cursor),
        }
    }
}

/// Fetches the content of resolved objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectReader {
    format: TableFormat,
}

impl ObjectReader {
    pub fn new(format: TableFormat) -> Self {
        Self { format }
    }

    /// Fetches the full content of `handle`.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the fetch fails, or `Decode` if text was
    /// requested and the content is not valid UTF-8.
    pub async fn read(&self, handle: &ObjectHandle, options: ReadOptions) -> Result<ObjectContent> {
        let data = handle
            .backend()
            .get(handle.bucket(), handle.key())
            .await
            .context("read")?;
        tracing::debug!("Read {} bytes from {}", data.len(), handle);

        if !options.decode_as_text {
            return Ok(if options.wrap_as_stream {
                ObjectContent::ByteStream(Cursor::new(data))
            } else {
                ObjectContent::Bytes(data)
            });
        }

        let text = decode_text(handle, data).context("read")?;

        Ok(if options.wrap_as_stream {
            ObjectContent::TextStream(Cursor::new(text))
        } else {
            ObjectContent::Text(text)
        })
    }

    pub async fn read_bytes(&self, handle: &ObjectHandle) -> Result<Bytes> {
        Ok(self.read(handle, ReadOptions::bytes()).await?.into_bytes())
    }

    pub async fn read_text(&self, handle: &ObjectHandle) -> Result<String> {
        let data = self.read_bytes(handle).await?;
        decode_text(handle, data).context("read")
    }

    /// Reads the object as delimited text and parses it into a table.
    pub async fn read_table(&self, handle: &ObjectHandle) -> Result<Table> {
        let content = self.read(handle, ReadOptions::text().streamed()).await?;
        read_csv(content.into_reader(), &self.format)
            .with_context(|| format!("read_table {}/{}", handle.bucket(), handle.key()))
    }
}

fn decode_text(handle: &ObjectHandle, data: Bytes) -> Result<String> {
    String::from_utf8(data.to_vec()).map_err(|source| StoreError::Decode {
        key: handle.key().to_string(),
        source,
    })
}
