use std::fs::File;
use std::io::{Cursor, Read, Stdin};

///
/// Source of rules text for commands that fall back to stdin when no file
/// is given. Tests swap stdin for an in-memory cursor.
///
pub struct Reader {
    inner: ReadBuffer,
}

impl Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ReadBuffer::Stdin(stdin) => stdin.read(buf),
            ReadBuffer::Cursor(cursor) => cursor.read(buf),
            ReadBuffer::File(file) => file.read(buf),
        }
    }
}

impl Reader {
    pub fn new(stdin: ReadBuffer) -> Self {
        Self { inner: stdin }
    }

    pub fn from_string(content: &str) -> Self {
        Self {
            inner: ReadBuffer::Cursor(Cursor::new(content.as_bytes().to_vec())),
        }
    }
}

pub enum ReadBuffer {
    Stdin(Stdin),
    Cursor(Cursor<Vec<u8>>),
    File(File),
}
