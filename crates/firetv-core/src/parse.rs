//! Parsers for the diagnostic text returned by `adb shell`
//!
//! Device output is free-form and varies between firmware versions, so every
//! parser here is lenient: a miss yields `None` / `false` and the caller
//! decides how to degrade.

use std::sync::LazyLock;

use regex::Regex;

use crate::prelude::*;
use crate::types::{FocusedWindow, IntentResult, PowerFacts};

/// `Window{<id> <user> <package>[/<activity>]}` at the end of a line
static WINDOW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)Window\{(?P<id>.+?) (?P<user>.+) (?P<package>[^/\s]+?)(?:/(?P<activity>.+?))?\}$")
        .expect("Invalid window pattern regex")
});

/// `size=N` on the power service `Locks` line
static LOCK_SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"size=(\d+)").expect("Invalid lock size regex"));

/// Parse the focused window out of a `dumpsys window windows` excerpt
///
/// Dumps may list earlier focus transitions as well, so the **last** matching
/// line wins. Returns `None` when no line matches.
///
/// ```
/// use firetv_core::parse_focused_window;
///
/// let window = parse_focused_window(
///     "mCurrentFocus=Window{299091cd u0 com.netflix.ninja/com.netflix.ninja.MainActivity}",
/// )
/// .unwrap();
/// assert_eq!(window.package, "com.netflix.ninja");
/// ```
pub fn parse_focused_window(raw: &str) -> Option<FocusedWindow> {
    let text = raw.replace('\r', "");
    let caps = WINDOW_PATTERN.captures_iter(&text).last()?;

    let package = caps.name("package")?.as_str().to_string();
    let activity = caps.name("activity").map(|m| m.as_str().to_string());

    trace!(
        "Focused window id={} user={} package={} activity={:?}",
        caps.name("id").map_or("", |m| m.as_str()),
        caps.name("user").map_or("", |m| m.as_str()),
        package,
        activity
    );

    Some(FocusedWindow { package, activity })
}

/// Check a dump for a literal marker; empty output never matches
pub fn dump_contains(raw: &str, needle: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && trimmed.contains(needle)
}

/// Read the wake lock count from the `Locks` section header
pub fn parse_lock_count(raw: &str) -> Option<u32> {
    raw.lines()
        .find(|line| line.contains("Locks"))
        .and_then(|line| LOCK_SIZE_PATTERN.captures(line))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse the facts of interest from a full `dumpsys power` report
pub fn parse_power_facts(raw: &str) -> PowerFacts {
    let line_has = |marker: &str, needle: &str| {
        raw.lines()
            .filter(|line| line.contains(marker))
            .any(|line| line.contains(needle))
    };

    PowerFacts {
        screen_on: line_has("Display Power", "state=ON"),
        awake: line_has("mWakefulness", "Awake"),
        wake_lock_count: parse_lock_count(raw).unwrap_or(0),
    }
}

/// Split the output of `monkey ...; echo $?`
///
/// The final line is the status echoed by the shell; everything before it is
/// joined back together in order.
pub fn parse_intent_output(raw: &str) -> Result<IntentResult> {
    let mut lines: Vec<&str> = raw.trim().lines().collect();

    let status = lines
        .pop()
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(|| Error::protocol("intent produced no output"))?;

    let return_code = status.trim().parse().map_err(|_| {
        Error::protocol(format!("intent status line is not a number: {:?}", status))
    })?;

    Ok(IntentResult {
        return_code,
        output: lines.join("\n"),
    })
}

/// Process name column of a `ps` line (its last whitespace-delimited token)
pub fn process_name(line: &str) -> Option<&str> {
    line.split_whitespace().last()
}

/// Reassembles logical lines from a stream of arbitrarily split chunks
///
/// A chunk may end mid-line or contain several lines; the trailing partial
/// line is held back until the next chunk (or [`LineSplitter::finish`]).
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: String,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every line it completed
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);

        let Some(last_newline) = self.pending.rfind('\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect()
    }

    /// Flush the unterminated tail, if any
    pub fn finish(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.pending);
        let tail = tail.trim_end_matches('\r');
        if tail.is_empty() {
            None
        } else {
            Some(tail.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_focused_window_with_activity() {
        let window = parse_focused_window(
            "Window{299091cd u0 com.netflix.ninja/com.netflix.ninja.MainActivity}",
        )
        .unwrap();

        assert_eq!(window.package, "com.netflix.ninja");
        assert_eq!(
            window.activity.as_deref(),
            Some("com.netflix.ninja.MainActivity")
        );
    }

    #[test]
    fn test_parse_focused_window_without_activity() {
        let window = parse_focused_window("  mCurrentFocus=Window{3c9a5f2 u0 StatusBar}").unwrap();
        assert_eq!(window.package, "StatusBar");
        assert_eq!(window.activity, None);
    }

    #[test]
    fn test_parse_focused_window_takes_last_line() {
        let raw = "  mCurrentFocus=Window{1a2b3c u0 com.amazon.tv.launcher/com.amazon.tv.launcher.ui.HomeActivity}\r\n\
                   \x20 mCurrentFocus=Window{4d5e6f u0 com.plexapp.android/com.plexapp.plex.activities.SplashActivity}\r\n";
        let window = parse_focused_window(raw).unwrap();

        assert_eq!(window.package, "com.plexapp.android");
        assert_eq!(
            window.activity.as_deref(),
            Some("com.plexapp.plex.activities.SplashActivity")
        );
    }

    #[test]
    fn test_parse_focused_window_strips_carriage_returns() {
        let window =
            parse_focused_window("mCurrentFocus=Window{ab u0 org.xbmc.kodi/.Splash}\r").unwrap();
        assert_eq!(window.package, "org.xbmc.kodi");
        assert_eq!(window.activity.as_deref(), Some(".Splash"));
    }

    #[test]
    fn test_parse_focused_window_no_match() {
        assert!(parse_focused_window("").is_none());
        assert!(parse_focused_window("mCurrentFocus=null").is_none());
        assert!(parse_focused_window("Window{unterminated u0 com.x").is_none());
    }

    #[test]
    fn test_dump_contains() {
        assert!(dump_contains("Display Power: state=ON\r\n", "state=ON"));
        assert!(!dump_contains("Display Power: state=OFF", "state=ON"));
        assert!(!dump_contains("", "state=ON"));
        assert!(!dump_contains("   \r\n", ""));
    }

    #[test]
    fn test_parse_lock_count() {
        assert_eq!(parse_lock_count("Wake Locks: size=2\n"), Some(2));
        assert_eq!(parse_lock_count("Suspend Blockers: size=4\nWake Locks: size=0"), Some(0));
        assert_eq!(parse_lock_count("no locks here"), None);
    }

    #[test]
    fn test_parse_power_facts() {
        let raw = "POWER MANAGER (dumpsys power)\n\
                   \x20 mWakefulness=Awake\n\
                   Display Power: state=ON\n\
                   Wake Locks: size=1\n\
                   \x20 PARTIAL_WAKE_LOCK 'AudioMix'\n";
        let facts = parse_power_facts(raw);

        assert!(facts.screen_on);
        assert!(facts.awake);
        assert_eq!(facts.wake_lock_count, 1);
    }

    #[test]
    fn test_parse_power_facts_asleep() {
        let raw = "mWakefulness=Dozing\nDisplay Power: state=OFF\nWake Locks: size=0\n";
        assert_eq!(parse_power_facts(raw), PowerFacts::default());
    }

    #[test]
    fn test_parse_intent_output() {
        let raw = "Events injected: 1\r\n## Network stats: elapsed time=18ms\r\n0\r\n";
        let result = parse_intent_output(raw).unwrap();

        assert_eq!(result.return_code, 0);
        assert_eq!(
            result.output,
            "Events injected: 1\n## Network stats: elapsed time=18ms"
        );
        assert!(result.success());
    }

    #[test]
    fn test_parse_intent_output_status_only() {
        let result = parse_intent_output("251\n").unwrap();
        assert_eq!(result.return_code, 251);
        assert_eq!(result.output, "");
    }

    #[test]
    fn test_parse_intent_output_rejects_garbage() {
        assert!(parse_intent_output("").is_err());
        assert!(parse_intent_output("** No activities found to run").is_err());
    }

    #[test]
    fn test_process_name() {
        assert_eq!(
            process_name("u0_a45    2201  310  912340 61244 SyS_epoll_ 00000000 S com.netflix.ninja"),
            Some("com.netflix.ninja")
        );
        assert_eq!(process_name("   "), None);
    }

    #[test]
    fn test_line_splitter_reassembles_fragments() {
        let mut splitter = LineSplitter::new();

        assert_eq!(splitter.push("USER  PID  NAME\r\nu0_a4"), vec!["USER  PID  NAME"]);
        assert_eq!(splitter.push("5  2201  com.netf"), Vec::<String>::new());
        assert_eq!(
            splitter.push("lix.ninja\r\nroot 1 init\r\n"),
            vec!["u0_a45  2201  com.netflix.ninja", "root 1 init"]
        );
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_line_splitter_multiple_lines_per_chunk() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push("a\nb\nc");
        assert_eq!(lines, vec!["a", "b"]);
        assert_eq!(splitter.finish().as_deref(), Some("c"));
    }
}
