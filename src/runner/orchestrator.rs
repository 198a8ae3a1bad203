use std::path::{Component, Path, PathBuf};

use anyhow::{Context, bail};
use tracing::{debug, warn};

use super::session::Session;
use crate::config::HOST_USER;
use crate::console::{Icon, LineSink};
use crate::docker::{BindMount, ContainerEngine, ContainerSpec, ExecSpec, host_user, image_reference};
use crate::error::{ContainerError, ImageError, RunError, Stage};
use crate::pull_output::ProgressRenderer;

/// Fixed container name; a leftover from an earlier run is removed first.
pub const CONTAINER_NAME: &str = "testbox";

/// How the user's command finished. Internal failures are [`RunError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(i64),
}

impl Outcome {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Failed(code) => code.clamp(1, 255) as u8,
        }
    }
}

/// Prepare the image, run the command in a fresh container and remove the
/// container again, reporting progress on `console`.
pub fn run<E>(engine: &E, session: &Session, console: &mut dyn LineSink) -> Result<Outcome, RunError>
where
    E: ContainerEngine + ?Sized,
{
    // ── Stale container ───────────────────────────────────────────────
    let removed = engine
        .remove_container(CONTAINER_NAME)
        .map_err(|e| ContainerError::new(Stage::Cleanup, e))?;
    if removed {
        debug!(name = CONTAINER_NAME, "removed leftover container");
    }

    // ── Image ─────────────────────────────────────────────────────────
    ensure_image(engine, session, console)?;

    // ── Container ─────────────────────────────────────────────────────
    console.print_line(Icon::Docker, "Create docker container...")?;
    let spec = container_spec(session)?;
    let created = engine
        .create_container(&spec)
        .map_err(|e| ContainerError::new(Stage::Create, e))?;
    let _guard = ContainerGuard {
        engine,
        id: created.id.clone(),
    };
    for warning in &created.warnings {
        console.print_line(Icon::None, &format!("Warning: {warning}"))?;
    }

    engine
        .start_container(&created.id)
        .map_err(|e| ContainerError::new(Stage::Start, e))?;
    debug!(id = %created.id, "container started");

    console.print_line(Icon::None, &format!("ContainerID: {}", created.id))?;
    console.print_line(
        Icon::None,
        &format!("WorkDir: {}", session.work_dir.display()),
    )?;
    console.print_line(
        Icon::None,
        &format!("Command: {}", session.display_command()),
    )?;

    // ── Exec ──────────────────────────────────────────────────────────
    let exec = exec_spec(session);
    let code = engine
        .exec(&created.id, &exec, console.raw())
        .map_err(|e| ContainerError::new(Stage::Exec, e))?;
    debug!(id = %created.id, code, "command finished");

    Ok(if code == 0 {
        Outcome::Success
    } else {
        Outcome::Failed(code)
    })
}

/// The default image tracks a moving tag and is always pulled; any other
/// image is only pulled when it is not cached locally.
fn ensure_image<E>(engine: &E, session: &Session, console: &mut dyn LineSink) -> Result<(), RunError>
where
    E: ContainerEngine + ?Sized,
{
    let image = &session.settings.image;
    let reference = image_reference(image);
    console.print_line(
        Icon::Docker,
        &format!("Prepare docker image ==> {reference}"),
    )?;

    if !session.settings.uses_default_image() {
        let cached = engine.image_id(image).map_err(|cause| ImageError::Request {
            reference: reference.clone(),
            cause,
        })?;
        if let Some(id) = cached {
            console.print_line(Icon::Docker, &format!("Use image cache, ID ==> {id}"))?;
            return Ok(());
        }
    }

    let output = engine.pull(&reference).map_err(|cause| ImageError::Request {
        reference: reference.clone(),
        cause,
    })?;
    ProgressRenderer::new(&mut *console)
        .render(output)
        .map_err(ImageError::from)?;
    debug!(%reference, "image ready");
    Ok(())
}

fn container_spec(session: &Session) -> Result<ContainerSpec, ContainerError> {
    let settings = &session.settings;
    let mut mounts = vec![BindMount {
        source: session.root_dir.clone(),
        target: session.root_dir.clone(),
    }];

    for (target, name) in &settings.cache_mounts {
        let source = cache_dir(&session.cache_root, name)
            .map_err(|e| ContainerError::new(Stage::Prepare, e))?;
        std::fs::create_dir_all(&source)
            .with_context(|| format!("failed to create cache directory {}", source.display()))
            .map_err(|e| ContainerError::new(Stage::Prepare, e))?;
        mounts.push(BindMount {
            source,
            target: PathBuf::from(target),
        });
    }

    Ok(ContainerSpec {
        name: CONTAINER_NAME.to_string(),
        image: settings.image.clone(),
        env: settings.env_pairs(),
        working_dir: session.work_dir.clone(),
        mounts,
        network_mode: settings.network_mode.clone(),
        privileged: settings.privileged,
    })
}

/// Host directory for a named cache. The name must be one plain path
/// component so the directory stays under `root`.
fn cache_dir(root: &Path, name: &str) -> anyhow::Result<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => Ok(root.join(part)),
        _ => bail!("invalid cache name `{name}`: must be a single directory name"),
    }
}

fn exec_spec(session: &Session) -> ExecSpec {
    let user = match session.settings.user.as_deref() {
        Some(HOST_USER) => host_user(),
        other => other.map(str::to_string),
    };
    ExecSpec {
        cmd: session.command.clone(),
        working_dir: session.work_dir.clone(),
        user,
        tty: session.exec_tty(),
    }
}

/// Removes the container when dropped, whichever way the run ends.
struct ContainerGuard<'a, E: ContainerEngine + ?Sized> {
    engine: &'a E,
    id: String,
}

impl<E: ContainerEngine + ?Sized> Drop for ContainerGuard<'_, E> {
    fn drop(&mut self) {
        match self.engine.remove_container(&self.id) {
            Ok(_) => debug!(id = %self.id, "container removed"),
            Err(err) => warn!(id = %self.id, error = %format!("{err:#}"), "failed to remove container"),
        }
    }
}
