use std::io::{BufRead, BufReader, Write};

use anyhow::{Context, Result, bail};
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, RemoveContainerOptions, StartContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use futures_util::StreamExt;
use tokio::runtime::Runtime;
use tracing::debug;

use super::connect::{Endpoint, SshTunnel, client};
use super::pull::PullReader;
use super::types::{ContainerSpec, CreatedContainer, ExecSpec};

/// The container-engine calls a run needs. All calls block.
pub trait ContainerEngine {
    /// Id of `image` in the local cache, `None` when it is not there.
    fn image_id(&self, image: &str) -> Result<Option<String>>;

    /// Start pulling `reference`; the reader yields the engine's progress
    /// records one JSON object per line.
    fn pull<'a>(&'a self, reference: &str) -> Result<Box<dyn BufRead + 'a>>;

    /// Force-remove a container by name or id. `false` if it did not exist.
    fn remove_container(&self, name: &str) -> Result<bool>;

    fn create_container(&self, spec: &ContainerSpec) -> Result<CreatedContainer>;

    fn start_container(&self, id: &str) -> Result<()>;

    /// Run `spec` in the container, copying its output to `out`, and return
    /// the command's exit code.
    fn exec(&self, container_id: &str, spec: &ExecSpec, out: &mut dyn Write) -> Result<i64>;
}

/// [`ContainerEngine`] over the Docker API.
pub struct DockerEngine {
    runtime: Runtime,
    docker: Docker,
    _tunnel: Option<SshTunnel>,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` (unset means the local socket).
    pub fn connect() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the async runtime")?;

        let host = std::env::var("DOCKER_HOST").ok();
        let endpoint = Endpoint::from_host(host.as_deref())?;
        debug!(?endpoint, "connecting to container engine");

        let (docker, tunnel) = {
            let _guard = runtime.enter();
            client(&endpoint)?
        };
        let docker = runtime
            .block_on(docker.negotiate_version())
            .context("container engine is not reachable")?;

        Ok(Self {
            runtime,
            docker,
            _tunnel: tunnel,
        })
    }
}

fn is_not_found(err: &BollardError) -> bool {
    matches!(
        err,
        BollardError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

/// An inspect result without an id does not count as cached.
fn cached_id(id: Option<String>) -> Option<String> {
    id.filter(|id| !id.is_empty())
}

impl ContainerEngine for DockerEngine {
    fn image_id(&self, image: &str) -> Result<Option<String>> {
        match self.runtime.block_on(self.docker.inspect_image(image)) {
            Ok(inspect) => Ok(cached_id(inspect.id)),
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to inspect image {image}")),
        }
    }

    fn pull<'a>(&'a self, reference: &str) -> Result<Box<dyn BufRead + 'a>> {
        let options = CreateImageOptions {
            from_image: reference.to_string(),
            ..Default::default()
        };
        let stream = Box::pin(self.docker.create_image(Some(options), None, None));
        Ok(Box::new(BufReader::new(PullReader::new(
            &self.runtime,
            stream,
        ))))
    }

    fn remove_container(&self, name: &str) -> Result<bool> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self
            .runtime
            .block_on(self.docker.remove_container(name, Some(options)))
        {
            Ok(()) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(err).with_context(|| format!("failed to remove container {name}")),
        }
    }

    fn create_container(&self, spec: &ContainerSpec) -> Result<CreatedContainer> {
        let mounts: Vec<Mount> = spec
            .mounts
            .iter()
            .map(|m| Mount {
                source: Some(m.source.to_string_lossy().into_owned()),
                target: Some(m.target.to_string_lossy().into_owned()),
                typ: Some(MountTypeEnum::BIND),
                read_only: Some(false),
                ..Default::default()
            })
            .collect();

        let host_config = HostConfig {
            mounts: Some(mounts),
            network_mode: Some(spec.network_mode.clone()),
            privileged: Some(spec.privileged),
            ..Default::default()
        };

        // The image's default command is usually a shell; keep it alive
        // so the exec has something to attach to.
        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(spec.env.clone()),
            working_dir: Some(spec.working_dir.to_string_lossy().into_owned()),
            tty: Some(true),
            open_stdin: Some(true),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };
        let response = self
            .runtime
            .block_on(self.docker.create_container(Some(options), config))?;

        Ok(CreatedContainer {
            id: response.id,
            warnings: response.warnings,
        })
    }

    fn start_container(&self, id: &str) -> Result<()> {
        self.runtime.block_on(
            self.docker
                .start_container(id, None::<StartContainerOptions<String>>),
        )?;
        Ok(())
    }

    fn exec(&self, container_id: &str, spec: &ExecSpec, out: &mut dyn Write) -> Result<i64> {
        self.runtime.block_on(async {
            let options = CreateExecOptions {
                cmd: Some(spec.cmd.clone()),
                working_dir: Some(spec.working_dir.to_string_lossy().into_owned()),
                user: spec.user.clone(),
                tty: Some(spec.tty),
                attach_stdout: Some(true),
                attach_stderr: Some(true),
                ..Default::default()
            };
            let exec = self
                .docker
                .create_exec(container_id, options)
                .await
                .context("failed to create exec instance")?;

            let start = StartExecOptions {
                tty: spec.tty,
                ..Default::default()
            };
            match self
                .docker
                .start_exec(&exec.id, Some(start))
                .await
                .context("failed to attach to exec instance")?
            {
                StartExecResults::Attached { mut output, .. } => {
                    while let Some(chunk) = output.next().await {
                        let chunk: LogOutput = chunk.context("exec output stream failed")?;
                        out.write_all(&chunk.into_bytes())?;
                        out.flush()?;
                    }
                }
                StartExecResults::Detached => bail!("exec started detached"),
            }

            let inspect = self
                .docker
                .inspect_exec(&exec.id)
                .await
                .context("failed to inspect exec instance")?;
            let code = inspect
                .exit_code
                .context("exec finished without an exit code")?;
            Ok::<_, anyhow::Error>(code)
        })
    }
}

/// `uid:gid` of the invoking user, so files the command writes into the
/// bind-mounted project stay owned by the caller. `None` off unix.
pub fn host_user() -> Option<String> {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() and getegid() are simple POSIX getters that always succeed and have no side effects.
        let uid = unsafe { libc::geteuid() };
        let gid = unsafe { libc::getegid() };
        Some(format!("{uid}:{gid}"))
    }

    #[cfg(not(unix))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn host_user_is_uid_gid() {
        let user = host_user().unwrap();
        let (uid, gid) = user.split_once(':').unwrap();
        assert!(uid.parse::<u32>().is_ok());
        assert!(gid.parse::<u32>().is_ok());
    }

    #[test]
    fn image_without_id_is_not_cached() {
        assert_eq!(cached_id(None), None);
        assert_eq!(cached_id(Some(String::new())), None);
        assert_eq!(
            cached_id(Some("sha256:4a3c2bb6".into())).as_deref(),
            Some("sha256:4a3c2bb6")
        );
    }

    #[test]
    fn not_found_is_recognised() {
        let missing = BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: testbox".into(),
        };
        let conflict = BollardError::DockerResponseServerError {
            status_code: 409,
            message: "removal already in progress".into(),
        };
        assert!(is_not_found(&missing));
        assert!(!is_not_found(&conflict));
    }
}
