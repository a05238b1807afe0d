// Copyright (c) 2026 MIPS-Memview Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream};

/// A frame arrived whole but its body is not JSON. The stream is still in
/// sync, so the next frame can be read.
#[derive(Debug)]
pub struct MalformedFrame {
    pub reason: String,
}

impl fmt::Display for MalformedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed frame body: {}", self.reason)
    }
}

impl Error for MalformedFrame {}

pub trait Transport {
    fn read_message(&mut self) -> Result<Value, Box<dyn Error + Send + Sync>>;
    fn write_message(&mut self, msg: &Value) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Read one `Content-Length` framed JSON body. Other headers are ignored.
pub fn read_framed<R: BufRead>(reader: &mut R) -> Result<Value, Box<dyn Error + Send + Sync>> {
    let mut content_length: Option<usize> = None;
    loop {
        let mut header_line = String::new();
        let n = reader.read_line(&mut header_line)?;
        if n == 0 {
            return Err("EOF while reading header".into());
        }
        let header_trim = header_line.trim();
        if header_trim.is_empty() {
            break; // end of headers
        }
        if header_trim.to_lowercase().starts_with("content-length") {
            if let Some(idx) = header_trim.find(':') {
                let num = header_trim[idx + 1..].trim();
                content_length = Some(num.parse::<usize>()?);
            }
        }
    }

    let len = content_length.ok_or("Missing Content-Length header")?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    serde_json::from_slice(&buf).map_err(|e| {
        Box::new(MalformedFrame {
            reason: e.to_string(),
        }) as Box<dyn Error + Send + Sync>
    })
}

pub fn write_framed<W: Write>(w: &mut W, msg: &Value) -> Result<(), Box<dyn Error + Send + Sync>> {
    let body = serde_json::to_vec(msg)?;
    write!(w, "Content-Length: {}\r\n\r\n", body.len())?;
    w.write_all(&body)?;
    w.flush()?;
    Ok(())
}

// Stdio-based transport (suitable for running as a child process)
pub struct StdioTransport {
    reader: BufReader<io::Stdin>,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(io::stdin()),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for StdioTransport {
    fn read_message(&mut self) -> Result<Value, Box<dyn Error + Send + Sync>> {
        read_framed(&mut self.reader)
    }

    fn write_message(&mut self, msg: &Value) -> Result<(), Box<dyn Error + Send + Sync>> {
        write_json_locked(msg)
    }
}

// TCP-based transport (bind-and-accept or connect)
pub struct TcpTransport {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl TcpTransport {
    /// Connects to a server at `addr` (eg "127.0.0.1:9257")
    pub fn connect(addr: &str) -> io::Result<Self> {
        Self::from_stream(TcpStream::connect(addr)?)
    }

    /// Bind to `addr`, accept a single connection and return a transport.
    pub fn listen_and_accept(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        log::info!("listening on {}", listener.local_addr()?);
        let (stream, peer) = listener.accept()?;
        log::info!("accepted connection from {}", peer);
        Self::from_stream(stream)
    }

    fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);
        Ok(Self { reader, writer })
    }
}

impl Transport for TcpTransport {
    fn read_message(&mut self) -> Result<Value, Box<dyn Error + Send + Sync>> {
        read_framed(&mut self.reader)
    }

    fn write_message(&mut self, msg: &Value) -> Result<(), Box<dyn Error + Send + Sync>> {
        write_framed(&mut self.writer, msg)
    }
}

/// Write a framed message to stdout while holding stdout's lock, so frames
/// from different threads never interleave.
pub fn write_json_locked(msg: &Value) -> Result<(), Box<dyn Error + Send + Sync>> {
    let stdout = io::stdout();
    let mut w = stdout.lock();
    write_framed(&mut w, msg)
}
