//! Remote keys and the closed set of actions callers may invoke by name

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A remote-control key, sent as `input keyevent <code>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Home,
    Up,
    Down,
    Left,
    Right,
    Enter,
    Back,
    Menu,
    VolumeUp,
    VolumeDown,
    Power,
    PlayPause,
    Play,
    Pause,
    Next,
    Previous,
}

impl KeyAction {
    /// Android `KeyEvent` code
    pub fn code(&self) -> u32 {
        match self {
            KeyAction::Menu => 1,
            KeyAction::Home => 3,
            KeyAction::Back => 4,
            KeyAction::Up => 19,
            KeyAction::Down => 20,
            KeyAction::Left => 21,
            KeyAction::Right => 22,
            KeyAction::VolumeUp => 24,
            KeyAction::VolumeDown => 25,
            KeyAction::Power => 26,
            KeyAction::Enter => 66,
            KeyAction::PlayPause => 85,
            KeyAction::Next => 87,
            KeyAction::Previous => 88,
            KeyAction::Play => 126,
            KeyAction::Pause => 127,
        }
    }

    /// Shell command that presses this key
    pub fn command(&self) -> String {
        format!("input keyevent {}", self.code())
    }
}

/// Actions that may be requested by name from outside the crate
///
/// The raw power key has no name here; it is reachable only through
/// `turn_on` / `turn_off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Key(KeyAction),
    TurnOn,
    TurnOff,
}

/// Name lookup table for [`Action::from_str`]
pub const ACTIONS: &[(&str, Action)] = &[
    ("turn_on", Action::TurnOn),
    ("turn_off", Action::TurnOff),
    ("home", Action::Key(KeyAction::Home)),
    ("up", Action::Key(KeyAction::Up)),
    ("down", Action::Key(KeyAction::Down)),
    ("left", Action::Key(KeyAction::Left)),
    ("right", Action::Key(KeyAction::Right)),
    ("enter", Action::Key(KeyAction::Enter)),
    ("back", Action::Key(KeyAction::Back)),
    ("menu", Action::Key(KeyAction::Menu)),
    ("volume_up", Action::Key(KeyAction::VolumeUp)),
    ("volume_down", Action::Key(KeyAction::VolumeDown)),
    ("media_play_pause", Action::Key(KeyAction::PlayPause)),
    ("media_play", Action::Key(KeyAction::Play)),
    ("media_pause", Action::Key(KeyAction::Pause)),
    ("media_next", Action::Key(KeyAction::Next)),
    ("media_previous", Action::Key(KeyAction::Previous)),
];

impl Action {
    pub fn name(&self) -> &'static str {
        ACTIONS
            .iter()
            .find(|(_, action)| action == self)
            .map(|(name, _)| *name)
            .unwrap_or("power")
    }

    /// All action names, in table order
    pub fn names() -> impl Iterator<Item = &'static str> {
        ACTIONS.iter().map(|(name, _)| *name)
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ACTIONS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, action)| *action)
            .ok_or_else(|| Error::UnknownAction {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
