//! Link sides, relay directions, proxy mode and lifecycle state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tinbus_core::{Command, CommandError};

/// One of the two Links the proxy owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The user's control panel.
    Panel,
    /// The heater unit.
    Heater,
}

impl Side {
    pub fn name(self) -> &'static str {
        match self {
            Side::Panel => "panel",
            Side::Heater => "heater",
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Panel => Side::Heater,
            Side::Heater => Side::Panel,
        }
    }

    /// Direction of bytes received on this side.
    pub fn outbound(self) -> Direction {
        match self {
            Side::Panel => Direction::PanelToHeater,
            Side::Heater => Direction::HeaterToPanel,
        }
    }

    /// Direction of bytes the proxy relays into this side.
    pub fn inbound(self) -> Direction {
        self.opposite().outbound()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("unknown side {0:?}, expected \"panel\" or \"heater\"")]
pub struct ParseSideError(String);

impl FromStr for Side {
    type Err = ParseSideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "panel" => Ok(Side::Panel),
            "heater" => Ok(Side::Heater),
            other => Err(ParseSideError(other.to_string())),
        }
    }
}

/// A relay direction, named after where the bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    PanelToHeater,
    HeaterToPanel,
}

impl Direction {
    pub fn source(self) -> Side {
        match self {
            Direction::PanelToHeater => Side::Panel,
            Direction::HeaterToPanel => Side::Heater,
        }
    }

    pub fn target(self) -> Side {
        self.source().opposite()
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::PanelToHeater => "panel->heater",
            Direction::HeaterToPanel => "heater->panel",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the proxy may originate its own commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Relay and observe only.  Nothing the proxy does adds bytes to a Link.
    #[default]
    Passive,
    /// May inject encoded commands between relayed frames.
    Active,
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProxyMode::Passive => "passive",
            ProxyMode::Active => "active",
        })
    }
}

#[derive(Debug, Error)]
#[error("unknown proxy mode {0:?}, expected \"passive\" or \"active\"")]
pub struct ParseModeError(String);

impl FromStr for ProxyMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passive" => Ok(ProxyMode::Passive),
            "active" => Ok(ProxyMode::Active),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Proxy lifecycle: `Idle → Relaying → Stopped`.  `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Idle,
    Relaying,
    Stopped,
}

/// A command the proxy should originate onto one Link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectRequest {
    pub target: Side,
    pub command: Command,
}

/// `<panel|heater> <command>`, e.g. `heater vent 3`.
impl FromStr for InjectRequest {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (side, rest) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
        let target = side.parse().map_err(|_| CommandError::Syntax(s.to_string()))?;
        Ok(Self { target, command: rest.parse()? })
    }
}

/// One line of the proxy's control input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyRequest {
    Inject(InjectRequest),
    SetMode(ProxyMode),
}

/// `mode <passive|active>`, or an [`InjectRequest`].
impl FromStr for ProxyRequest {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(char::is_whitespace) {
            Some(("mode", mode)) => mode
                .trim()
                .parse()
                .map(ProxyRequest::SetMode)
                .map_err(|_| CommandError::Syntax(s.trim().to_string())),
            _ => s.parse().map(ProxyRequest::Inject),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinbus_core::SelectField;

    #[test]
    fn test_directions_pair_with_sides() {
        assert_eq!(Side::Panel.outbound(), Direction::PanelToHeater);
        assert_eq!(Side::Panel.inbound(), Direction::HeaterToPanel);
        assert_eq!(Direction::HeaterToPanel.target(), Side::Panel);
        assert_eq!(Direction::PanelToHeater.to_string(), "panel->heater");
    }

    #[test]
    fn test_mode_parses_and_defaults_to_passive() {
        assert_eq!(ProxyMode::default(), ProxyMode::Passive);
        assert_eq!("active".parse::<ProxyMode>().unwrap(), ProxyMode::Active);
        assert!("loud".parse::<ProxyMode>().is_err());
    }

    #[test]
    fn test_parse_inject_request() {
        let req: InjectRequest = "heater vent 3".parse().unwrap();
        assert_eq!(req.target, Side::Heater);
        assert_eq!(req.command, Command::SetLevel { select: SelectField::VentSpeed, index: 3 });
    }

    #[test]
    fn test_parse_inject_request_rejects_bad_side_or_command() {
        assert!(matches!("bus vent 3".parse::<InjectRequest>(), Err(CommandError::Syntax(_))));
        assert!("panel".parse::<InjectRequest>().is_err());
        assert!("panel blow 3".parse::<InjectRequest>().is_err());
    }

    #[test]
    fn test_parse_proxy_request() {
        assert_eq!(
            "mode active".parse::<ProxyRequest>().unwrap(),
            ProxyRequest::SetMode(ProxyMode::Active)
        );
        assert!(matches!("panel air 21.5".parse::<ProxyRequest>(), Ok(ProxyRequest::Inject(_))));
        assert!("mode loud".parse::<ProxyRequest>().is_err());
    }
}
