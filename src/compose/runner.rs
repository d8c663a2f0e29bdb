// Runs the Engine's compose CLI for one project and streams its output.

use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::translate::{PathTranslator, TranslatedManifest, preprocess};
use crate::engine::Endpoint;
use crate::error::{Error, Result};
use crate::logs::{LogLine, LogStreamKind};

/// Variables passed through to the child unchanged. Everything else is dropped so secrets in
/// this process's environment never reach the CLI or its plugins.
const ENV_ALLOWLIST: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "LOGNAME",
    "SHELL",
    "LANG",
    "LC_ALL",
    "LC_CTYPE",
    "TZ",
    "TMPDIR",
    "XDG_RUNTIME_DIR",
    "DOCKER_CONFIG",
    "DOCKER_CONTEXT",
    "DOCKER_CERT_PATH",
    "DOCKER_TLS_VERIFY",
    "DOCKER_API_VERSION",
    "DOCKER_BUILDKIT",
    "BUILDKIT_PROGRESS",
];

/// Compose configuration variables (`COMPOSE_PROFILES`, `COMPOSE_PARALLEL_LIMIT`, ...).
const ENV_PREFIX: &str = "COMPOSE_";

const OUTPUT_CHANNEL_CAPACITY: usize = 256;

/// Keeps allowlisted, `COMPOSE_`-prefixed and explicitly configured variables.
pub fn filter_env<I>(vars: I, extra: &[String]) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter(|(key, _)| {
            ENV_ALLOWLIST.contains(&key.as_str())
                || key.starts_with(ENV_PREFIX)
                || extra.iter().any(|e| e == key)
        })
        .collect()
}

fn process_env(extra: &[String]) -> Vec<(String, String)> {
    let vars = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
    filter_env(vars, extra)
}

fn validate_service(service: &Option<String>) -> Result<()> {
    let Some(s) = service else {
        return Ok(());
    };
    let valid = !s.is_empty()
        && !s.starts_with('-')
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::invalid(format!("invalid service name {:?}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeCommand {
    Up { build: bool, pull_always: bool },
    Down { volumes: bool, remove_orphans: bool },
    Pull { service: Option<String> },
    Logs { follow: bool, tail: Option<u64>, service: Option<String> },
    Restart { service: Option<String> },
    Stop { service: Option<String> },
}

impl ComposeCommand {
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        let mut push = |s: &str| args.push(s.to_string());
        let service = match self {
            ComposeCommand::Up { build, pull_always } => {
                push("up");
                push("-d");
                if *build {
                    push("--build");
                }
                if *pull_always {
                    push("--pull");
                    push("always");
                }
                None
            }
            ComposeCommand::Down {
                volumes,
                remove_orphans,
            } => {
                push("down");
                if *volumes {
                    push("-v");
                }
                if *remove_orphans {
                    push("--remove-orphans");
                }
                None
            }
            ComposeCommand::Pull { service } => {
                push("pull");
                service.as_ref()
            }
            ComposeCommand::Logs {
                follow,
                tail,
                service,
            } => {
                push("logs");
                if *follow {
                    push("-f");
                }
                if let Some(n) = tail {
                    push("--tail");
                    push(&n.to_string());
                }
                service.as_ref()
            }
            ComposeCommand::Restart { service } => {
                push("restart");
                service.as_ref()
            }
            ComposeCommand::Stop { service } => {
                push("stop");
                service.as_ref()
            }
        };
        if let Some(s) = service {
            args.push(s.clone());
        }
        args
    }

    /// Service names are passed as arguments; anything that could read as a flag is refused.
    pub fn validate(&self) -> Result<()> {
        match self {
            ComposeCommand::Pull { service }
            | ComposeCommand::Logs { service, .. }
            | ComposeCommand::Restart { service }
            | ComposeCommand::Stop { service } => validate_service(service),
            _ => Ok(()),
        }
    }

    /// Commands that change which containers exist or run.
    pub fn mutates(&self) -> bool {
        !matches!(
            self,
            ComposeCommand::Pull { .. } | ComposeCommand::Logs { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ComposeCommand::Up { .. } => "up",
            ComposeCommand::Down { .. } => "down",
            ComposeCommand::Pull { .. } => "pull",
            ComposeCommand::Logs { .. } => "logs",
            ComposeCommand::Restart { .. } => "restart",
            ComposeCommand::Stop { .. } => "stop",
        }
    }
}

impl fmt::Display for ComposeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args().join(" "))
    }
}

/// Result of a finished compose process. A non-zero exit is reported here, not as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeOutcome {
    /// `-1` when the process was killed by a signal.
    pub exit_code: i32,
    pub success: bool,
    /// Combined stdout and stderr, one line per entry, in arrival order.
    pub output: String,
}

/// A running compose process. Dropping it kills the process and removes any translated
/// manifest.
pub struct ComposeRun {
    child: Child,
    lines: mpsc::Receiver<LogLine>,
    output: Vec<String>,
    capture: bool,
    manifest: Option<TranslatedManifest>,
    command: &'static str,
}

impl ComposeRun {
    /// Stops retaining lines for the final outcome; for long-running streamed output.
    pub fn without_capture(mut self) -> Self {
        self.capture = false;
        self.output.clear();
        self
    }

    /// Next line of combined output, or `None` once both pipes are closed.
    pub async fn next_line(&mut self) -> Option<LogLine> {
        let line = self.lines.recv().await?;
        if self.capture {
            self.output.push(line.text.clone());
        }
        Some(line)
    }

    /// Drains remaining output and waits for the exit status.
    pub async fn wait(mut self) -> Result<ComposeOutcome> {
        while self.next_line().await.is_some() {}
        let status = self.child.wait().await;
        self.release_manifest();
        let status = status?;
        let exit_code = status.code().unwrap_or(-1);
        debug!(command = self.command, exit_code, "compose process exited");
        Ok(ComposeOutcome {
            exit_code,
            success: status.success(),
            output: std::mem::take(&mut self.output).join("\n"),
        })
    }

    /// Kills the process and releases its temporary files.
    pub async fn cancel(mut self) -> Result<()> {
        let killed = self.child.kill().await;
        self.release_manifest();
        debug!(command = self.command, "compose process cancelled");
        Ok(killed?)
    }

    fn release_manifest(&mut self) {
        if let Some(manifest) = self.manifest.take() {
            manifest.cleanup();
        }
    }
}

fn forward<R>(reader: R, stream: LogStreamKind, tx: mpsc::Sender<LogLine>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    if tx.send(LogLine { stream, text }).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "compose output read failed");
                    break;
                }
            }
        }
    });
}

pub struct ComposeRunner {
    binary: String,
    extra_env: Vec<String>,
    translator: PathTranslator,
    docker_host: String,
}

impl ComposeRunner {
    pub fn new(
        binary: impl Into<String>,
        extra_env: Vec<String>,
        translator: PathTranslator,
        endpoint: &Endpoint,
    ) -> Self {
        Self {
            binary: binary.into(),
            extra_env,
            translator,
            docker_host: endpoint.docker_host(),
        }
    }

    /// The standalone `docker-compose` binary takes no `compose` subcommand.
    fn subcommand(&self) -> Option<&'static str> {
        let standalone = Path::new(&self.binary)
            .file_name()
            .is_some_and(|n| n == "docker-compose");
        (!standalone).then_some("compose")
    }

    /// Flags selecting the manifest. With differing path views the manifest is translated
    /// first and the project directory is given in the host's namespace.
    async fn manifest_args(
        &self,
        dir: &Path,
        manifest_path: &Path,
    ) -> Result<(Vec<OsString>, Option<TranslatedManifest>)> {
        if self.translator.is_identity() {
            return Ok((vec!["-f".into(), manifest_path.into()], None));
        }
        let translated = preprocess(manifest_path, dir, &self.translator).await?;
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            translated.path().into(),
            "--project-directory".into(),
            self.translator.to_host(dir).into(),
        ];
        let env_file: PathBuf = dir.join(".env");
        if tokio::fs::try_exists(&env_file).await.unwrap_or(false) {
            args.push("--env-file".into());
            args.push(env_file.into());
        }
        Ok((args, Some(translated)))
    }

    /// Starts `command` for the project in `dir`.
    pub async fn spawn(
        &self,
        dir: &Path,
        manifest_path: &Path,
        command: &ComposeCommand,
    ) -> Result<ComposeRun> {
        command.validate()?;
        let (manifest_args, manifest) = self.manifest_args(dir, manifest_path).await?;

        let mut cmd = Command::new(&self.binary);
        cmd.args(self.subcommand())
            .args(&manifest_args)
            .args(command.args())
            .current_dir(dir)
            .env_clear()
            .envs(process_env(&self.extra_env))
            .env("DOCKER_HOST", &self.docker_host)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(
            project = %dir.display(),
            command = %command,
            translated = manifest.is_some(),
            "starting compose command"
        );
        // on spawn failure `manifest` is dropped here, which removes it
        let mut child = cmd.spawn()?;

        let (tx, lines) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        if let Some(stdout) = child.stdout.take() {
            forward(stdout, LogStreamKind::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward(stderr, LogStreamKind::Stderr, tx);
        }

        Ok(ComposeRun {
            child,
            lines,
            output: Vec::new(),
            capture: true,
            manifest,
            command: command.name(),
        })
    }

    /// Runs `command` to completion.
    pub async fn run(
        &self,
        dir: &Path,
        manifest_path: &Path,
        command: &ComposeCommand,
    ) -> Result<ComposeOutcome> {
        self.spawn(dir, manifest_path, command).await?.wait().await
    }
}
