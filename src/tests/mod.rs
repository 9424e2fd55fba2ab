
use std::io::{self, Cursor, Seek, SeekFrom, Write};

/// In-memory sink that fails exactly once after accepting `budget` bytes
///
/// The failing call still stores the part of the buffer that fit, the way a
/// short write followed by an error leaves a real file.
pub struct FlakySink {
    data: Cursor<Vec<u8>>,
    budget: Option<usize>,
}
impl FlakySink {
    pub fn new(budget: usize) -> Self {
        Self {
            data: Cursor::new(Vec::new()),
            budget: Some(budget),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        self.data.get_ref()
    }
}
impl Write for FlakySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.budget {
            None => self.data.write(buf),
            Some(0) => {
                self.budget = None;
                Err(io::Error::other("disk full"))
            }
            Some(left) => {
                let n = left.min(buf.len());
                self.budget = Some(left - n);
                self.data.write(&buf[..n])
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
impl Seek for FlakySink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.data.seek(pos)
    }
}
