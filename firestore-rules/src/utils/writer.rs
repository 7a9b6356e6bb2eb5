use std::fs::File;
use std::io::{Error as IoError, ErrorKind, Stderr, Stdout, Write};

///
/// Output sink handed to every command, regular output goes to `buffer`,
/// diagnostics and failures to `err`.
///
pub struct Writer {
    buffer: WriteBuffer,
    err: WriteBuffer,
}

impl Default for Writer {
    fn default() -> Self {
        Self {
            buffer: WriteBuffer::Stdout(std::io::stdout()),
            err: WriteBuffer::Stderr(std::io::stderr()),
        }
    }
}

impl Writer {
    pub fn new(buffer: WriteBuffer, err: WriteBuffer) -> Self {
        Self { buffer, err }
    }

    pub fn write_err(&mut self, s: String) -> std::io::Result<()> {
        writeln!(self.err, "{}", s)
    }

    pub fn into_string(self) -> std::io::Result<String> {
        self.buffer.into_string()
    }

    pub fn err_into_string(self) -> std::io::Result<String> {
        self.err.into_string()
    }

    ///
    /// Captured regular output with ANSI colour codes removed
    ///
    pub fn stripped(self) -> std::io::Result<String> {
        self.buffer.stripped()
    }

    pub fn err_to_stripped(self) -> std::io::Result<String> {
        self.err.stripped()
    }
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(String::from_utf8_lossy(buf).as_bytes())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.buffer.flush()
    }
}

pub enum WriteBuffer {
    Stdout(Stdout),
    Stderr(Stderr),
    Vec(Vec<u8>),
    File(File),
}

fn utf8(bytes: Vec<u8>) -> std::io::Result<String> {
    String::from_utf8(bytes).map_err(|e| IoError::new(ErrorKind::InvalidData, e))
}

impl WriteBuffer {
    fn into_string(self) -> std::io::Result<String> {
        match self {
            WriteBuffer::Vec(vec) => utf8(vec),
            _ => Err(IoError::new(
                ErrorKind::Unsupported,
                "only in-memory buffers can be read back",
            )),
        }
    }

    fn stripped(self) -> std::io::Result<String> {
        match self {
            WriteBuffer::Vec(vec) => utf8(strip_ansi_escapes::strip(&vec)?),
            _ => Err(IoError::new(
                ErrorKind::Unsupported,
                "only in-memory buffers can be read back",
            )),
        }
    }
}

impl Write for WriteBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            WriteBuffer::Stdout(stdout) => stdout.write(buf),
            WriteBuffer::Stderr(stderr) => stderr.write(buf),
            WriteBuffer::Vec(vec) => vec.write(buf),
            WriteBuffer::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            WriteBuffer::Stdout(stdout) => stdout.flush(),
            WriteBuffer::Stderr(stderr) => stderr.flush(),
            WriteBuffer::Vec(vec) => vec.flush(),
            WriteBuffer::File(file) => file.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colored::Colorize;

    #[test]
    fn stripped_removes_colours() {
        let mut writer = Writer::new(WriteBuffer::Vec(vec![]), WriteBuffer::Vec(vec![]));
        write!(writer, "{} rules.rules", "PASS".green()).unwrap();
        assert_eq!(writer.stripped().unwrap(), "PASS rules.rules");
    }

    #[test]
    fn errors_go_to_their_own_buffer() {
        let mut writer = Writer::new(WriteBuffer::Vec(vec![]), WriteBuffer::Vec(vec![]));
        writer.write_err(String::from("bad")).unwrap();
        assert_eq!(writer.err_into_string().unwrap(), "bad\n");
    }
}
