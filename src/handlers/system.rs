//! system - handlers that act on the host: apps, files, search, media, timers, weather
//!
//! Browser mode (no executor) answers with what would have happened. Desktop
//! mode picks a `ShellAction`, renders it through the platform command table
//! and runs it. A non-empty stderr or a rejected command marks the turn failed.

use regex::Regex;
use serde_json::{json, Map, Value};

use super::{HandlerContext, TaskResponse, Utterance};
use crate::shell::{command_for, CommandExecutor, ShellAction};

lazy_static::lazy_static! {
    static ref KNOWN_APPS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)open\s+(browser|chrome|firefox|edge|safari)").unwrap(), "browser"),
        (Regex::new(r"(?i)open\s+(mail|email|outlook|gmail)").unwrap(), "email"),
        (Regex::new(r"(?i)open\s+(word|document|docs)").unwrap(), "word processor"),
        (Regex::new(r"(?i)open\s+(excel|spreadsheet|sheets)").unwrap(), "spreadsheet"),
        (Regex::new(r"(?i)open\s+(powerpoint|presentation|slides)").unwrap(), "presentation"),
        (Regex::new(r"(?i)open\s+(calendar|schedule)").unwrap(), "calendar"),
        (Regex::new(r"(?i)open\s+(terminal|command|prompt|console)").unwrap(), "terminal"),
        (Regex::new(r"(?i)open\s+(settings|preferences|control panel)").unwrap(), "settings"),
        (Regex::new(r"(?i)open\s+(calculator)").unwrap(), "calculator"),
        (Regex::new(r"(?i)open\s+(camera)").unwrap(), "camera"),
        (Regex::new(r"(?i)open\s+(photos|gallery|images)").unwrap(), "photos"),
        (Regex::new(r"(?i)open\s+(video|movies|player)").unwrap(), "video player"),
    ];
    static ref APP_TARGET: Regex = Regex::new(r"(?i)\b(?:open|launch|start|run)\s+(.+)").unwrap();

    static ref RENAME: Regex = Regex::new(
        r"(?i)rename\s+(?:the\s+)?(?:file\s+|folder\s+)?(\S+)\s+to\s+(\S+)"
    ).unwrap();
    static ref CREATE_FOLDER: Regex = Regex::new(
        r"(?i)(?:create|make|new)\s+(?:a\s+)?(?:new\s+)?(?:folder|directory)\s+(?:called\s+|named\s+)?(\S+)"
    ).unwrap();
    static ref CREATE_FILE: Regex = Regex::new(
        r"(?i)(?:create|make|new)\s+(?:a\s+)?(?:new\s+)?file\s+(?:called\s+|named\s+)?(\S+)"
    ).unwrap();
    static ref DELETE: Regex = Regex::new(
        r"(?i)(?:delete|remove)\s+(?:the\s+)?(?:(file|folder|directory)\s+)?(?:called\s+|named\s+)?(\S+)"
    ).unwrap();
    static ref LIST: Regex = Regex::new(
        r"(?i)(?:list|show)\s+(?:the\s+|my\s+)?files(?:\s+in\s+(\S+))?"
    ).unwrap();
    static ref OPEN_PATH: Regex = Regex::new(
        r"(?i)open\s+(?:the\s+)?(?:file|folder)\s+(\S+)"
    ).unwrap();

    static ref SEARCH_QUERY: Regex = Regex::new(r"(?i)(search for|search|find|look for|google)[:\s]+(.*)").unwrap();
    static ref SEARCH_WORD: Regex = Regex::new(r"(?i)search|find|look for|google").unwrap();
    static ref PLAY: Regex = Regex::new(r"(?i)play\s+(.*)").unwrap();
    static ref DURATION: Regex = Regex::new(r"(?i)(\d+)\s*(second|minute|hour|day)s?").unwrap();
    static ref LOCATION: Regex = Regex::new(r"(?i)(?:weather|forecast|temperature)\s+(?:in|for|at)\s+([\p{L}\s\-]+)").unwrap();
}

pub async fn handle_app(utterance: &Utterance, ctx: &HandlerContext) -> TaskResponse {
    let target = APP_TARGET
        .captures(utterance.raw())
        .map(|c| clean_target(&c[1]))
        .filter(|t| !t.is_empty());

    let Some(executor) = ctx.executor.as_deref() else {
        if let Some((_, app)) = KNOWN_APPS.iter().find(|(re, _)| re.is_match(utterance.raw())) {
            return TaskResponse::ok_with(
                format!(
                    "I would open the {} for you if this were a full implementation. In a native app, I would use system APIs to launch this application.",
                    app
                ),
                json!({ "appName": app }),
            );
        }
        let app = target.unwrap_or_else(|| "the app".to_string());
        return TaskResponse::ok_with(
            format!(
                "I would open {} for you, but I'm currently running in a web browser. In a native implementation, I would use system APIs to launch applications.",
                app
            ),
            json!({ "appName": app }),
        );
    };

    let Some(app) = target else {
        return TaskResponse::ok("Tell me which app to open, for example \"open calculator\".");
    };

    let action = ShellAction::LaunchApp { app: app.clone() };
    run(executor, ctx, &action)
        .await
        .respond(format!("Opening {}.", app), &format!("I couldn't open {}", app))
        .with_field("appName", json!(app))
        .into()
}

pub async fn handle_file(utterance: &Utterance, ctx: &HandlerContext) -> TaskResponse {
    let text = utterance.lower();

    let Some(executor) = ctx.executor.as_deref() else {
        let message = if text.contains("create") || text.contains("new") {
            "I would create a new file or folder for you. In a full implementation, I would use the File System Access API or system-level APIs for this operation."
        } else if text.contains("delete") || text.contains("remove") {
            "I would delete the specified file or folder for you. In a full implementation, this would use secure file system operations."
        } else if text.contains("rename") {
            "I would rename your file or folder. In a full implementation, this would use file system APIs to safely rename files."
        } else if text.contains("open") {
            "I would open the file or folder for you. In a full implementation, I would access your file system to open the requested item."
        } else {
            "I can help with file operations like creating, opening, renaming, or deleting files in a full implementation. Currently, I'm running in a web browser with limited file system access."
        };
        return TaskResponse::ok(message);
    };

    let Some((action, done)) = file_action(utterance.raw()) else {
        return TaskResponse::ok(
            "Tell me the file and what to do with it, for example \"create file notes.txt\" or \"rename draft.txt to final.txt\".",
        );
    };

    run(executor, ctx, &action)
        .await
        .respond(done, "I couldn't complete that file operation")
        .into()
}

fn file_action(text: &str) -> Option<(ShellAction, String)> {
    if let Some(c) = RENAME.captures(text) {
        let (from, to) = (clean_target(&c[1]), clean_target(&c[2]));
        let done = format!("Renamed {} to {}.", from, to);
        return Some((ShellAction::RenameFile { from, to }, done));
    }
    if let Some(c) = CREATE_FOLDER.captures(text) {
        let path = clean_target(&c[1]);
        return Some((ShellAction::CreateFolder { path: path.clone() }, format!("Created folder {}.", path)));
    }
    if let Some(c) = CREATE_FILE.captures(text) {
        let path = clean_target(&c[1]);
        return Some((ShellAction::CreateFile { path: path.clone() }, format!("Created file {}.", path)));
    }
    if let Some(c) = DELETE.captures(text) {
        let path = clean_target(&c[2]);
        let done = format!("Deleted {}.", path);
        let is_folder = c
            .get(1)
            .map_or(false, |kind| !kind.as_str().eq_ignore_ascii_case("file"));
        let action = if is_folder {
            ShellAction::DeleteFolder { path }
        } else {
            ShellAction::DeleteFile { path }
        };
        return Some((action, done));
    }
    if let Some(c) = LIST.captures(text) {
        let path = c.get(1).map(|m| clean_target(m.as_str())).unwrap_or_else(|| ".".to_string());
        return Some((ShellAction::ListDir { path: path.clone() }, format!("Here are the files in {}:", path)));
    }
    if let Some(c) = OPEN_PATH.captures(text) {
        let path = clean_target(&c[1]);
        return Some((ShellAction::OpenPath { path: path.clone() }, format!("Opening {}.", path)));
    }
    None
}

pub async fn handle_search(utterance: &Utterance, ctx: &HandlerContext) -> TaskResponse {
    let raw = utterance.raw();
    let query = match SEARCH_QUERY.captures(raw) {
        Some(c) => c[2].trim().to_string(),
        None => SEARCH_WORD.replace(raw, "").trim().to_string(),
    };

    if query.is_empty() {
        return TaskResponse::ok(
            "I can help you search for information. Try saying \"Search for recent documents\" or \"Find information about quantum physics\".",
        );
    }

    let Some(executor) = ctx.executor.as_deref() else {
        return TaskResponse::ok_with(
            format!(
                "I would search for \"{}\". In a full implementation, I would search your local files, knowledge base, or help you search the web safely.",
                query
            ),
            json!({ "query": query }),
        );
    };

    let url = format!(
        "https://www.google.com/search?q={}",
        urlencoding::encode(&query)
    );
    run(executor, ctx, &ShellAction::OpenUrl { url })
        .await
        .respond(format!("Searching for \"{}\".", query), "I couldn't start that search")
        .with_field("query", json!(query))
        .into()
}

pub async fn handle_music(utterance: &Utterance, ctx: &HandlerContext) -> TaskResponse {
    let text = utterance.lower();

    let request = if text.contains("play") {
        let song = PLAY
            .captures(utterance.raw())
            .map(|c| c[1].trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "music".to_string());
        Some((ShellAction::MediaPlay, song))
    } else if text.contains("pause") || text.contains("stop") {
        Some((ShellAction::MediaPause, String::new()))
    } else if text.contains("volume up") || text.contains("turn up") {
        Some((ShellAction::VolumeUp, String::new()))
    } else if text.contains("volume down") || text.contains("turn down") {
        Some((ShellAction::VolumeDown, String::new()))
    } else {
        None
    };

    let Some((action, song)) = request else {
        return TaskResponse::ok(
            "I can control your music playback in a full implementation. Try saying \"Play some rock music\", \"Pause the music\", or \"Turn up the volume\".",
        );
    };

    let Some(executor) = ctx.executor.as_deref() else {
        return match action {
            ShellAction::MediaPlay => TaskResponse::ok_with(
                format!(
                    "I would play {} from your local library. In a full implementation, I would access your music files and play the requested content.",
                    song
                ),
                json!({ "request": song }),
            ),
            ShellAction::MediaPause => TaskResponse::ok(
                "Music paused. In a full implementation, I would control your media playback.",
            ),
            ShellAction::VolumeUp => TaskResponse::ok(
                "I've increased the volume. In a full implementation, I would adjust your system volume.",
            ),
            _ => TaskResponse::ok(
                "I've decreased the volume. In a full implementation, I would adjust your system volume.",
            ),
        };
    };

    let done = match action {
        ShellAction::MediaPlay => "Playing.",
        ShellAction::MediaPause => "Music paused.",
        ShellAction::VolumeUp => "I've increased the volume.",
        _ => "I've decreased the volume.",
    };
    run(executor, ctx, &action)
        .await
        .respond(done.to_string(), "I couldn't control playback")
        .into()
}

pub async fn handle_timer(utterance: &Utterance, ctx: &HandlerContext) -> TaskResponse {
    let Some(caps) = DURATION.captures(utterance.raw()) else {
        return TaskResponse::ok(
            "I can set timers and reminders for you. Try saying \"Set a timer for 5 minutes\" or \"Remind me to check the oven in 20 minutes\".",
        );
    };

    let Ok(amount) = caps[1].parse::<u64>() else {
        return TaskResponse::fail("That timer is too long for me to keep track of.");
    };
    let unit = caps[2].to_lowercase();
    let label = format!("{} {}{}", amount, unit, if amount != 1 { "s" } else { "" });

    let Some(executor) = ctx.executor.as_deref() else {
        return TaskResponse::ok_with(
            format!(
                "I've set a timer for {}. In a full implementation, I would use the notification API to alert you when the time is up.",
                label
            ),
            json!({ "amount": amount, "unit": unit }),
        );
    };

    let seconds = amount.saturating_mul(unit_seconds(&unit));
    let action = ShellAction::TimerNotify {
        seconds,
        label: format!("Your {} timer is up", label),
    };
    run(executor, ctx, &action)
        .await
        .respond(
            format!("I've set a timer for {}. I'll notify you when the time is up.", label),
            "I couldn't set that timer",
        )
        .with_field("amount", json!(amount))
        .with_field("unit", json!(unit))
        .into()
}

fn unit_seconds(unit: &str) -> u64 {
    match unit {
        "minute" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        _ => 1,
    }
}

pub async fn handle_weather(utterance: &Utterance, ctx: &HandlerContext) -> TaskResponse {
    let Some(executor) = ctx.executor.as_deref() else {
        return TaskResponse::ok(
            "In a full implementation, I would provide weather information by either accessing a local weather API or using offline weather data. Currently, I'm a demo running in a web browser with limited access to external services.",
        );
    };

    let location = LOCATION
        .captures(utterance.raw())
        .map(|c| clean_target(&c[1]))
        .filter(|l| !l.is_empty());

    let outcome = run(executor, ctx, &ShellAction::Weather { location: location.clone() }).await;
    let report = outcome.stdout.trim().to_string();
    let done = if report.is_empty() {
        "The weather service didn't return a report.".to_string()
    } else {
        report
    };
    outcome
        .respond(done, "I couldn't fetch the weather")
        .with_field("location", json!(location))
        .into()
}

fn clean_target(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['.', '?', '!'])
        .trim_matches(['"', '\''])
        .trim()
        .to_string()
}

/// Result of running one action, before it is turned into a response.
struct ShellOutcome {
    command: String,
    stdout: String,
    stderr: String,
    failure: Option<String>,
}

impl ShellOutcome {
    fn is_error(&self) -> bool {
        self.failure.is_some() || !self.stderr.trim().is_empty()
    }

    fn respond(self, done: String, failed_prefix: &str) -> ShellResponse {
        let error = self.is_error();
        let message = if error {
            let detail = if self.stderr.trim().is_empty() {
                self.failure.clone().unwrap_or_default()
            } else {
                self.stderr.trim().to_string()
            };
            format!("{}: {}", failed_prefix, detail)
        } else if !self.stdout.trim().is_empty() && done.ends_with(':') {
            format!("{}\n{}", done, self.stdout.trim_end())
        } else {
            done
        };

        let mut data = Map::new();
        data.insert("command".into(), json!(self.command));
        data.insert("stdout".into(), json!(self.stdout));
        data.insert("stderr".into(), json!(self.stderr));
        data.insert("error".into(), json!(error));

        ShellResponse {
            message,
            success: !error,
            data,
        }
    }
}

struct ShellResponse {
    message: String,
    success: bool,
    data: Map<String, Value>,
}

impl ShellResponse {
    fn with_field(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }
}

impl From<ShellResponse> for TaskResponse {
    fn from(r: ShellResponse) -> Self {
        TaskResponse {
            message: r.message,
            success: r.success,
            data: Some(Value::Object(r.data)),
        }
    }
}

async fn run(executor: &dyn CommandExecutor, ctx: &HandlerContext, action: &ShellAction) -> ShellOutcome {
    let command = command_for(action, ctx.platform);
    tracing::debug!(%command, platform = ctx.platform.as_str(), "Running shell action");

    match executor.execute(&command).await {
        Ok(out) => ShellOutcome {
            command,
            stdout: out.stdout,
            stderr: out.stderr,
            failure: None,
        },
        Err(e) => {
            tracing::warn!(%command, error = %e.error, "Shell action failed");
            ShellOutcome {
                command,
                stdout: String::new(),
                stderr: e.stderr,
                failure: Some(e.error),
            }
        }
    }
}
