/*!
 * Blocking FTP client over `std::net`
 *
 * One control connection, passive-mode data connections, one transfer at a
 * time. Only the commands needed to move single files are implemented.
 */

use std::io::{BufRead, BufReader, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, trace};

use super::error::{FtpError, FtpResult};
use super::{DataCommand, FileType, FtpTransport};
use crate::core::copier::DEFAULT_CHUNK_SIZE;
use crate::core::session::StreamSize;

/// A complete (possibly multi-line) server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    /// 1xx
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// 450 / 550: the file is missing or cannot be accessed
    pub fn is_file_unavailable(&self) -> bool {
        matches!(self.code, 450 | 550)
    }

    fn into_error(self) -> FtpError {
        FtpError::Reply {
            code: self.code,
            message: self.text,
        }
    }
}

pub struct FtpConnection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    file_type: FileType,
    buffer_size: usize,
    timeout: Duration,
    pending_command: bool,
}

impl FtpConnection {
    /// Connect and consume the server greeting
    pub fn connect(host: &str, port: u16, timeout: Duration) -> FtpResult<Self> {
        let stream = connect_any(host, port, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let mut connection = Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
            file_type: FileType::Ascii,
            buffer_size: DEFAULT_CHUNK_SIZE,
            timeout,
            pending_command: false,
        };

        let greeting = connection.read_reply()?;
        if !greeting.is_completion() {
            return Err(greeting.into_error());
        }
        debug!("Connected to {}:{}: {}", host, port, greeting.text);
        Ok(connection)
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> FtpResult<()> {
        self.writer.set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.buffer_size = buffer_size;
    }

    /// USER / PASS
    pub fn login(&mut self, username: &str, password: &str) -> FtpResult<()> {
        let reply = self.command(&format!("USER {}", username))?;
        let reply = if reply.is_intermediate() {
            self.command(&format!("PASS {}", password))?
        } else {
            reply
        };

        if reply.is_completion() {
            debug!("Logged in as {}", username);
            Ok(())
        } else {
            Err(reply.into_error())
        }
    }

    /// QUIT, consuming the connection
    pub fn quit(mut self) -> FtpResult<()> {
        let reply = self.command("QUIT")?;
        if reply.is_completion() {
            Ok(())
        } else {
            Err(reply.into_error())
        }
    }

    /// Send one command line and read its reply
    pub fn command(&mut self, line: &str) -> FtpResult<Reply> {
        self.send(line)?;
        self.read_reply()
    }

    fn send(&mut self, line: &str) -> FtpResult<()> {
        if line.starts_with("PASS ") {
            trace!("> PASS ****");
        } else {
            trace!("> {}", line);
        }
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\r\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> FtpResult<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(FtpError::Disconnected);
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        trace!("< {}", line);
        Ok(line)
    }

    /// Read one reply, following `NNN-` continuation lines up to the
    /// closing `NNN ` line
    pub fn read_reply(&mut self) -> FtpResult<Reply> {
        let first = self.read_line()?;
        let code = parse_code(&first)?;
        let mut text = first.get(4..).unwrap_or("").to_string();

        if first.as_bytes().get(3) == Some(&b'-') {
            let terminator = format!("{} ", code);
            loop {
                let line = self.read_line()?;
                if line.starts_with(&terminator) || line == code.to_string() {
                    text.push('\n');
                    text.push_str(line.get(4..).unwrap_or(""));
                    break;
                }
                text.push('\n');
                text.push_str(&line);
            }
        }

        Ok(Reply { code, text })
    }

    /// Create every directory leading to `path` (its last component is the
    /// file itself). Directories that already exist are not an error.
    pub fn make_parent_directories(&mut self, path: &str) -> FtpResult<()> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let Some((_, directories)) = components.split_last() else {
            return Ok(());
        };

        let mut current = if path.starts_with('/') { String::from("/") } else { String::new() };
        for directory in directories {
            current.push_str(directory);
            let reply = self.command(&format!("MKD {}", current))?;
            // 550: already exists (or not permitted; STOR will tell)
            if !reply.is_completion() && reply.code != 550 {
                return Err(reply.into_error());
            }
            current.push('/');
        }
        Ok(())
    }

    /// PASV, then connect to the advertised endpoint
    fn open_passive(&mut self) -> FtpResult<TcpStream> {
        let reply = self.command("PASV")?;
        if reply.code != 227 {
            return Err(reply.into_error());
        }

        let mut address = parse_pasv(&reply.text)?;
        // Servers behind NAT often advertise an address they cannot be reached on
        if address.ip().is_unspecified() {
            address.set_ip(self.writer.peer_addr()?.ip());
        }

        debug!("Opening data connection to {}", address);
        let stream = TcpStream::connect_timeout(&address, self.timeout)?;
        stream.set_read_timeout(self.writer.read_timeout()?)?;
        stream.set_write_timeout(Some(self.timeout))?;
        Ok(stream)
    }
}

impl FtpTransport for FtpConnection {
    type Data = TcpStream;

    fn file_type(&self) -> FileType {
        self.file_type
    }

    fn set_file_type(&mut self, file_type: FileType) -> FtpResult<()> {
        let reply = self.command(&format!("TYPE {}", file_type.type_code()))?;
        if !reply.is_completion() {
            return Err(reply.into_error());
        }
        self.file_type = file_type;
        Ok(())
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn size(&mut self, path: &str) -> FtpResult<StreamSize> {
        let reply = self.command(&format!("SIZE {}", path))?;
        if reply.code != 213 {
            return Err(reply.into_error());
        }
        reply
            .text
            .trim()
            .parse::<u64>()
            .map(StreamSize::Known)
            .map_err(|_| FtpError::Protocol(format!("Invalid SIZE reply: {}", reply.text)))
    }

    fn open_data_connection(&mut self, command: DataCommand, path: &str) -> FtpResult<Option<TcpStream>> {
        let data = self.open_passive()?;
        let reply = self.command(&format!("{} {}", command.verb(), path))?;

        if reply.is_preliminary() {
            self.pending_command = true;
            Ok(Some(data))
        } else if reply.is_file_unavailable() {
            debug!("{} {} unavailable: {} {}", command.verb(), path, reply.code, reply.text);
            Ok(None)
        } else {
            Err(reply.into_error())
        }
    }

    fn complete_pending_command(&mut self) -> FtpResult<()> {
        if !self.pending_command {
            return Ok(());
        }
        self.pending_command = false;
        let reply = self.read_reply()?;
        debug!("Transfer finished: {} {}", reply.code, reply.text);
        if reply.is_completion() {
            Ok(())
        } else {
            Err(reply.into_error())
        }
    }
}

fn connect_any(host: &str, port: u16, timeout: Duration) -> FtpResult<TcpStream> {
    let mut last_error = None;
    for address in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&address, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(match last_error {
        Some(e) => FtpError::Io(e),
        None => FtpError::Protocol(format!("No address found for {}", host)),
    })
}

fn parse_code(line: &str) -> FtpResult<u16> {
    line.get(..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| FtpError::Protocol(format!("Malformed reply: {:?}", line)))
}

/// Extract the data endpoint from a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply
pub fn parse_pasv(text: &str) -> FtpResult<SocketAddr> {
    let pattern = Regex::new(r"(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3})")
        .map_err(|e| FtpError::Protocol(e.to_string()))?;
    let captures = pattern
        .captures(text)
        .ok_or_else(|| FtpError::Protocol(format!("Invalid PASV reply: {}", text)))?;

    let mut parts = [0u8; 6];
    for (i, part) in parts.iter_mut().enumerate() {
        *part = captures[i + 1]
            .parse()
            .map_err(|_| FtpError::Protocol(format!("Invalid PASV reply: {}", text)))?;
    }

    let ip = Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
    let port = (u16::from(parts[4]) << 8) | u16::from(parts[5]);
    Ok(SocketAddr::new(IpAddr::V4(ip), port))
}
