use std::{
    fs,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender};
use log::debug;
use xz2::read::XzDecoder;

use crate::error::TraceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub kind: AccessKind,
    pub addr: u64,
}

/// Parses one trace line such as `r 0x7fff5a8c` or `w 0x10`, without its newline.
///
/// The kind is decided by whether the line contains an `r` anywhere, then a `w`.
/// The address is read as hex starting at the third byte. A line with no hex
/// digits there reads as address 0. Lines are bytes; they need not be UTF-8.
pub fn parse_line(line_no: u64, line: &[u8]) -> Result<Access, TraceError> {
    let malformed = || TraceError::Malformed {
        line_no,
        line: String::from_utf8_lossy(line).into_owned(),
    };

    let kind = if line.contains(&b'r') {
        AccessKind::Read
    } else if line.contains(&b'w') {
        AccessKind::Write
    } else {
        return Err(malformed());
    };

    let addr = line.get(2..).map(parse_hex).ok_or_else(malformed)?;
    Ok(Access { kind, addr })
}

fn parse_hex(text: &[u8]) -> u64 {
    let start = text
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(text.len());
    let text = &text[start..];
    let text = text
        .strip_prefix(b"0x")
        .or_else(|| text.strip_prefix(b"0X"))
        .unwrap_or(text);
    let digits_end = text
        .iter()
        .position(|b| !b.is_ascii_hexdigit())
        .unwrap_or(text.len());

    text[..digits_end]
        .iter()
        .try_fold(0u64, |acc, &b| {
            let digit = (b as char).to_digit(16)?;
            acc.checked_mul(16)?.checked_add(u64::from(digit))
        })
        .unwrap_or(u64::MAX)
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceSource {
    Stdin,
    /// Decompressed with xz when the name ends in `.xz`.
    File(PathBuf),
}

pub type AccessBlock = Result<Vec<Access>, TraceError>;

/// Parses the trace on a background thread and hands over blocks of accesses
/// in file order. A malformed line arrives as the final `Err`.
pub struct Trace {
    pub rec: Receiver<AccessBlock>,
    _thread: JoinHandle<()>,
}

impl Trace {
    pub fn read(
        source: TraceSource,
        accesses_per_block: usize,
        blocks_per_queue: usize,
    ) -> io::Result<Trace> {
        let reader: Box<dyn BufRead + Send> = match source {
            TraceSource::Stdin => Box::new(BufReader::new(io::stdin())),
            TraceSource::File(path) => {
                let stream = fs::File::open(&path)?;
                if path.extension().is_some_and(|ext| ext == "xz") {
                    debug!("Reading xz trace {}", path.display());
                    Box::new(BufReader::new(XzDecoder::new(stream)))
                } else {
                    debug!("Reading trace {}", path.display());
                    Box::new(BufReader::new(stream))
                }
            }
        };
        Ok(Trace::from_reader(reader, accesses_per_block, blocks_per_queue))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(
        reader: R,
        accesses_per_block: usize,
        blocks_per_queue: usize,
    ) -> Trace {
        let (sender, receiver) = crossbeam::channel::bounded(blocks_per_queue);
        let accesses_per_block = accesses_per_block.max(1);

        let t = thread::spawn(move || Trace::run_thread(reader, accesses_per_block, sender));

        Trace {
            rec: receiver,
            _thread: t,
        }
    }

    fn run_thread(mut reader: impl BufRead, accesses_per_block: usize, queue: Sender<AccessBlock>) {
        let mut buffer = Vec::with_capacity(accesses_per_block);
        let mut line = Vec::new();
        let mut line_no = 0;
        loop {
            line.clear();
            let parsed = match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    line_no += 1;
                    parse_line(line_no, trim_newline(&line))
                }
                Err(err) => Err(TraceError::from(err)),
            };

            match parsed {
                Ok(access) => {
                    buffer.push(access);
                    if buffer.len() == accesses_per_block {
                        let full =
                            std::mem::replace(&mut buffer, Vec::with_capacity(accesses_per_block));
                        if queue.send(Ok(full)).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    if !buffer.is_empty() && queue.send(Ok(buffer)).is_err() {
                        return;
                    }
                    let _ = queue.send(Err(err));
                    return;
                }
            }
        }

        if !buffer.is_empty() {
            let _ = queue.send(Ok(buffer));
        }
    }
}
