//! Run a single command on a remote host over SSH
//!
//! Host keys are not verified. The underlying session is blocking, so every
//! command runs on tokio's blocking pool.

use std::fs::File;
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ssh2::{ExtendedData, Session};
use tracing::{debug, instrument, trace};

use super::error::{SshError, SshResult};

#[derive(Debug, Clone)]
pub struct Ssh {
    pub addr: String,
    pub user: String,
    /// Timeout for the TCP connect and for blocking session calls. `None`
    /// waits forever.
    pub timeout: Option<Duration>,
}

#[derive(Clone)]
enum Credentials {
    Password(String),
    KeyFile(PathBuf),
}

impl Credentials {
    /// Password logins see stderr too, key logins only stdout.
    fn output(&self) -> Output {
        match self {
            Credentials::Password(_) => Output::Combined,
            Credentials::KeyFile(_) => Output::Stdout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    /// stdout and stderr interleaved
    Combined,
    /// stdout only, stderr discarded
    Stdout,
}

impl Output {
    fn extended_data(self) -> ExtendedData {
        match self {
            Output::Combined => ExtendedData::Merge,
            Output::Stdout => ExtendedData::Ignore,
        }
    }
}

/// The key must be a regular file we can open.
fn check_key_file(path: &Path) -> SshResult<()> {
    let key_file_error = |source: io::Error| SshError::KeyFile {
        path: path.to_path_buf(),
        source,
    };

    let metadata = File::open(path)
        .and_then(|file| file.metadata())
        .map_err(key_file_error)?;

    if !metadata.is_file() {
        return Err(key_file_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }

    Ok(())
}

/// Map the exit status of a finished command onto its output.
fn command_result(status: i32, output: Vec<u8>) -> SshResult<Vec<u8>> {
    if status != 0 {
        return Err(SshError::CommandFailed { status, output });
    }
    Ok(output)
}

impl Ssh {
    pub fn new(addr: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            user: user.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Authenticate with `password` and run `cmd`, returning stdout and stderr
    /// combined.
    #[instrument(skip(self, password), fields(addr = %self.addr, user = %self.user))]
    pub async fn execute_with_password(&self, password: &str, cmd: &str) -> SshResult<Vec<u8>> {
        self.spawn_exec(Credentials::Password(password.to_string()), cmd)
            .await
    }

    /// Authenticate with the private key in `file` and run `cmd`, returning
    /// stdout only.
    #[instrument(skip(self, file), fields(addr = %self.addr, user = %self.user))]
    pub async fn execute_with_key_file(
        &self,
        file: impl AsRef<Path>,
        cmd: &str,
    ) -> SshResult<Vec<u8>> {
        self.spawn_exec(Credentials::KeyFile(file.as_ref().to_path_buf()), cmd)
            .await
    }

    async fn spawn_exec(&self, credentials: Credentials, cmd: &str) -> SshResult<Vec<u8>> {
        let target = self.clone();
        let cmd = cmd.to_string();

        tokio::task::spawn_blocking(move || target.exec_blocking(&credentials, &cmd)).await?
    }

    fn exec_blocking(&self, credentials: &Credentials, cmd: &str) -> SshResult<Vec<u8>> {
        // fail on an unreadable key before touching the network
        if let Credentials::KeyFile(path) = credentials {
            check_key_file(path)?;
        }

        let session = self.connect(credentials)?;

        let mut channel = session.channel_session()?;
        channel.handle_extended_data(credentials.output().extended_data())?;

        trace!("executing {cmd:?}");
        channel.exec(cmd)?;

        let mut buffer = Vec::new();
        channel.read_to_end(&mut buffer)?;
        channel.wait_close()?;

        let status = channel.exit_status()?;
        debug!("command finished with status {status}");

        command_result(status, buffer)
    }

    fn open_stream(&self) -> io::Result<TcpStream> {
        let Some(timeout) = self.timeout else {
            return TcpStream::connect(&self.addr);
        };

        let mut last_error = None;
        for addr in self.addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
        }))
    }

    fn connect(&self, credentials: &Credentials) -> SshResult<Session> {
        let tcp = self.open_stream().map_err(|source| SshError::Connect {
            addr: self.addr.clone(),
            source,
        })?;

        let mut session = Session::new()?;
        if let Some(timeout) = self.timeout {
            session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        }
        session.set_tcp_stream(tcp);
        session.handshake()?;

        let auth = match credentials {
            Credentials::Password(password) => session.userauth_password(&self.user, password),
            Credentials::KeyFile(path) => session.userauth_pubkey_file(&self.user, None, path, None),
        };
        auth.map_err(|source| SshError::Auth {
            user: self.user.clone(),
            source,
        })?;

        Ok(session)
    }
}
