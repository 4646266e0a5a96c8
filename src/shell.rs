//! shell - platform command table and the shell-execution capability
//!
//! Handlers never build command strings themselves: they pick a `ShellAction`
//! and `command_for` turns it into the platform's command with every argument
//! passed through `quote`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

/// Generate a unique ID with prefix
pub fn make_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    #[serde(rename = "macos")]
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
        }
    }
}

/// Something the assistant can ask the OS to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ShellAction {
    LaunchApp { app: String },
    OpenPath { path: String },
    OpenUrl { url: String },
    CreateFile { path: String },
    CreateFolder { path: String },
    DeleteFile { path: String },
    DeleteFolder { path: String },
    RenameFile { from: String, to: String },
    ListDir { path: String },
    MediaPlay,
    MediaPause,
    VolumeUp,
    VolumeDown,
    TimerNotify { seconds: u64, label: String },
    Weather { location: Option<String> },
}

/// Quote one argument for the platform shell.
///
/// POSIX shells get single quotes with embedded quotes spliced as `'\''`.
/// `cmd.exe` has no reliable escape for `"`, so embedded double quotes are dropped.
pub fn quote(platform: Platform, arg: &str) -> String {
    match platform {
        Platform::Windows => format!("\"{}\"", arg.replace('"', "")),
        Platform::MacOs | Platform::Linux => format!("'{}'", arg.replace('\'', r"'\''")),
    }
}

/// The command string for `action` on `platform`.
pub fn command_for(action: &ShellAction, platform: Platform) -> String {
    use Platform::*;
    use ShellAction::*;

    let q = |s: &str| quote(platform, s);

    match (action, platform) {
        (LaunchApp { app }, Windows) => format!("start \"\" {}", q(app)),
        (LaunchApp { app }, MacOs) => format!("open -a {}", q(app)),
        (LaunchApp { app }, Linux) => format!("nohup {} >/dev/null 2>&1 &", q(app)),

        (OpenPath { path }, Windows) => format!("start \"\" {}", q(path)),
        (OpenPath { path }, MacOs) => format!("open {}", q(path)),
        (OpenPath { path }, Linux) => format!("xdg-open {}", q(path)),

        (OpenUrl { url }, Windows) => format!("start \"\" {}", q(url)),
        (OpenUrl { url }, MacOs) => format!("open {}", q(url)),
        (OpenUrl { url }, Linux) => format!("xdg-open {}", q(url)),

        (CreateFile { path }, Windows) => format!("type nul > {}", q(path)),
        (CreateFile { path }, _) => format!("touch {}", q(path)),

        (CreateFolder { path }, Windows) => format!("mkdir {}", q(path)),
        (CreateFolder { path }, _) => format!("mkdir -p {}", q(path)),

        (DeleteFile { path }, Windows) => format!("del /q {}", q(path)),
        (DeleteFile { path }, _) => format!("rm -- {}", q(path)),

        (DeleteFolder { path }, Windows) => format!("rmdir /s /q {}", q(path)),
        (DeleteFolder { path }, _) => format!("rm -r -- {}", q(path)),

        (RenameFile { from, to }, Windows) => format!("ren {} {}", q(from), q(to)),
        (RenameFile { from, to }, _) => format!("mv -- {} {}", q(from), q(to)),

        (ListDir { path }, Windows) => format!("dir {}", q(path)),
        (ListDir { path }, _) => format!("ls -la {}", q(path)),

        (MediaPlay, Windows) | (MediaPause, Windows) => {
            "powershell -NoProfile -Command \"(New-Object -ComObject WScript.Shell).SendKeys([char]179)\"".to_string()
        }
        (MediaPlay, MacOs) => "osascript -e 'tell application \"Music\" to play'".to_string(),
        (MediaPause, MacOs) => "osascript -e 'tell application \"Music\" to pause'".to_string(),
        (MediaPlay, Linux) => "playerctl play".to_string(),
        (MediaPause, Linux) => "playerctl pause".to_string(),

        (VolumeUp, Windows) => {
            "powershell -NoProfile -Command \"(New-Object -ComObject WScript.Shell).SendKeys([char]175)\"".to_string()
        }
        (VolumeDown, Windows) => {
            "powershell -NoProfile -Command \"(New-Object -ComObject WScript.Shell).SendKeys([char]174)\"".to_string()
        }
        (VolumeUp, MacOs) => {
            "osascript -e 'set volume output volume ((output volume of (get volume settings)) + 10)'".to_string()
        }
        (VolumeDown, MacOs) => {
            "osascript -e 'set volume output volume ((output volume of (get volume settings)) - 10)'".to_string()
        }
        (VolumeUp, Linux) => "pactl set-sink-volume @DEFAULT_SINK@ +10%".to_string(),
        (VolumeDown, Linux) => "pactl set-sink-volume @DEFAULT_SINK@ -10%".to_string(),

        (TimerNotify { seconds, label }, Windows) => format!(
            "start /b powershell -NoProfile -Command \"Start-Sleep -Seconds {}; msg * {}\"",
            seconds,
            label.replace('"', "").replace('\'', "")
        ),
        (TimerNotify { seconds, label }, MacOs) => format!(
            "(sleep {} && osascript -e {}) >/dev/null 2>&1 &",
            seconds,
            q(&format!(
                "display notification \"{}\" with title \"BUDDY Timer\"",
                label.replace('"', "")
            ))
        ),
        (TimerNotify { seconds, label }, Linux) => format!(
            "(sleep {} && notify-send 'BUDDY Timer' {}) >/dev/null 2>&1 &",
            seconds,
            q(label)
        ),

        (Weather { location }, _) => {
            let place = location
                .as_deref()
                .map(|l| urlencoding::encode(l.trim()).into_owned())
                .unwrap_or_default();
            format!("curl -s {}", q(&format!("https://wttr.in/{}?format=3", place)))
        }
    }
}

/// What a finished shell command printed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A command that could not run or exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{error}")]
pub struct ShellError {
    pub error: String,
    pub stderr: String,
}

impl ShellError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            stderr: String::new(),
        }
    }
}

/// The shell-execution capability consumed by handlers and the terminal.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> Result<ShellOutput, ShellError>;
}

/// Runs commands through the platform shell (`sh -c` / `cmd /C`).
#[derive(Debug, Clone)]
pub struct SystemShell {
    platform: Platform,
    timeout_ms: Option<u64>,
}

impl SystemShell {
    pub fn new(platform: Platform, timeout_ms: Option<u64>) -> Self {
        Self {
            platform,
            timeout_ms,
        }
    }
}

impl Default for SystemShell {
    fn default() -> Self {
        Self::new(Platform::current(), Some(60_000))
    }
}

#[async_trait]
impl CommandExecutor for SystemShell {
    async fn execute(&self, command: &str) -> Result<ShellOutput, ShellError> {
        let mut cmd = match self.platform {
            Platform::Windows => {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(command);
                c
            }
            Platform::MacOs | Platform::Linux => {
                let mut c = Command::new("sh");
                c.arg("-c").arg(command);
                c
            }
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| ShellError::new(e.to_string()))?;
        tracing::debug!(command, "Spawned shell command");

        let output = match self.timeout_ms {
            Some(ms) => timeout(Duration::from_millis(ms), child.wait_with_output())
                .await
                .map_err(|_| ShellError::new(format!("Command timed out after {} ms", ms)))?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| ShellError::new(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ShellError {
                error: format!("Command failed: {} (exit {})", command, code),
                stderr,
            });
        }

        Ok(ShellOutput { stdout, stderr })
    }
}
