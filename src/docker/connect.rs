use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use bollard::{API_DEFAULT_VERSION, Docker};
use tracing::{debug, warn};

/// Socket the engine listens on at the far end of an SSH connection.
const REMOTE_SOCKET: &str = "/var/run/docker.sock";
const TUNNEL_WAIT: Duration = Duration::from_secs(15);
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const CLIENT_TIMEOUT_SECS: u64 = 120;

/// How to reach the engine, derived from `DOCKER_HOST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix socket / named pipe defaults.
    Local,
    /// `tcp://` or `http://`.
    Http,
    Ssh(SshTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// `[user@]host`
    pub destination: String,
    pub port: Option<u16>,
}

impl Endpoint {
    pub fn from_host(host: Option<&str>) -> Result<Self> {
        match host.map(str::trim).filter(|h| !h.is_empty()) {
            None => Ok(Endpoint::Local),
            Some(h) if h.starts_with("ssh://") => Ok(Endpoint::Ssh(parse_ssh(h)?)),
            Some(h) if h.starts_with("tcp://") || h.starts_with("http://") => Ok(Endpoint::Http),
            Some(_) => Ok(Endpoint::Local),
        }
    }
}

fn parse_ssh(url: &str) -> Result<SshTarget> {
    let rest = url.trim_start_matches("ssh://");
    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        bail!("no host in DOCKER_HOST `{url}`");
    }

    let (destination, port) = match authority.rsplit_once(':') {
        Some((dest, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            let port = port
                .parse()
                .with_context(|| format!("invalid port in DOCKER_HOST `{url}`"))?;
            (dest, Some(port))
        }
        _ => (authority, None),
    };
    if destination.is_empty() || destination.ends_with('@') {
        bail!("no host in DOCKER_HOST `{url}`");
    }

    Ok(SshTarget {
        destination: destination.to_string(),
        port,
    })
}

/// `ssh -L` forwarding a local unix socket to the remote engine socket.
/// The ssh process and the socket file live as long as this value.
pub struct SshTunnel {
    child: Child,
    socket: PathBuf,
}

impl SshTunnel {
    pub fn open(target: &SshTarget) -> Result<Self> {
        let socket = std::env::temp_dir().join(format!("testbox-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket);

        let mut cmd = Command::new("ssh");
        cmd.args(["-nNT", "-o", "ExitOnForwardFailure=yes"])
            .arg("-L")
            .arg(format!("{}:{REMOTE_SOCKET}", socket.display()));
        if let Some(port) = target.port {
            cmd.arg("-p").arg(port.to_string());
        }
        cmd.arg(&target.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null());

        let child = cmd
            .spawn()
            .context("failed to invoke `ssh`, is it installed and on PATH?")?;
        let mut tunnel = Self { child, socket };
        tunnel.wait_ready()?;
        debug!(socket = %tunnel.socket.display(), host = %target.destination, "ssh tunnel ready");
        Ok(tunnel)
    }

    pub fn socket(&self) -> &std::path::Path {
        &self.socket
    }

    fn wait_ready(&mut self) -> Result<()> {
        let start = Instant::now();
        while !self.socket.exists() {
            if let Some(status) = self.child.try_wait()? {
                bail!("ssh exited before the tunnel was ready ({status})");
            }
            if start.elapsed() > TUNNEL_WAIT {
                bail!("timed out waiting for the ssh tunnel");
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Err(err) = std::fs::remove_file(&self.socket)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            warn!(socket = %self.socket.display(), error = %err, "failed to remove tunnel socket");
        }
    }
}

/// Build a client for `endpoint`. Must run inside the engine's runtime
/// context. The returned tunnel, if any, must outlive the client.
pub fn client(endpoint: &Endpoint) -> Result<(Docker, Option<SshTunnel>)> {
    match endpoint {
        Endpoint::Local => {
            let docker = Docker::connect_with_local_defaults()
                .context("failed to connect to the local Docker daemon")?;
            Ok((docker, None))
        }
        Endpoint::Http => {
            let docker = Docker::connect_with_http_defaults()
                .context("failed to connect to DOCKER_HOST")?;
            Ok((docker, None))
        }
        #[cfg(unix)]
        Endpoint::Ssh(target) => {
            let tunnel = SshTunnel::open(target)?;
            let socket = tunnel.socket().to_string_lossy().into_owned();
            let docker = Docker::connect_with_unix(&socket, CLIENT_TIMEOUT_SECS, API_DEFAULT_VERSION)
                .context("failed to connect through the ssh tunnel")?;
            Ok((docker, Some(tunnel)))
        }
        #[cfg(not(unix))]
        Endpoint::Ssh(_) => bail!("ssh:// DOCKER_HOST is only supported on unix hosts"),
    }
}
