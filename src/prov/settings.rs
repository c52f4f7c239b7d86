use std::fmt;
use std::str::FromStr;

pub const MIN_NODES: u32 = 5;
pub const MAX_NODES: u32 = 200;
pub const MIN_HOPS: u32 = 1;
pub const MAX_HOPS: u32 = 200;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraversalDirection {
    #[default]
    Both,
    Forward,
    Backward,
}

impl TraversalDirection {
    pub const ALL: [Self; 3] = [Self::Both, Self::Forward, Self::Backward];

    pub fn name(self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }

    fn flags(self) -> (bool, bool) {
        match self {
            Self::Both => (true, true),
            Self::Forward => (true, false),
            Self::Backward => (false, true),
        }
    }
}

impl fmt::Display for TraversalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TraversalDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|direction| direction.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown direction `{value}` (expected both, forward or backward)"))
    }
}

/// How much lineage the server returns around an object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraversalSettings {
    pub max_nodes: u32,
    pub max_hops: u32,
    pub include_npes: bool,
    pub follow_npids: bool,
    pub direction: TraversalDirection,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self {
            max_nodes: 50,
            max_hops: 8,
            include_npes: true,
            follow_npids: false,
            direction: TraversalDirection::Both,
        }
    }
}

impl TraversalSettings {
    /// Brings the limits back into the range the server accepts.
    pub fn clamped(&self) -> Self {
        Self {
            max_nodes: self.max_nodes.clamp(MIN_NODES, MAX_NODES),
            max_hops: self.max_hops.clamp(MIN_HOPS, MAX_HOPS),
            ..self.clone()
        }
    }

    /// Query parameters of a graph request, limits clamped.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let settings = self.clamped();
        let (forward, backward) = settings.direction.flags();
        vec![
            ("n", settings.max_nodes.to_string()),
            ("maxHops", settings.max_hops.to_string()),
            ("includeNodes", true.to_string()),
            ("includeEdges", true.to_string()),
            ("includeNPEs", settings.include_npes.to_string()),
            ("followNPIDs", settings.follow_npids.to_string()),
            ("forward", forward.to_string()),
            ("backward", backward.to_string()),
            ("breadthFirst", true.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        let settings = TraversalSettings {
            max_nodes: 1,
            max_hops: 900,
            ..TraversalSettings::default()
        }
        .clamped();
        assert_eq!(settings.max_nodes, MIN_NODES);
        assert_eq!(settings.max_hops, MAX_HOPS);
    }

    #[test]
    fn query_follows_direction() {
        let settings = TraversalSettings {
            direction: TraversalDirection::Backward,
            ..TraversalSettings::default()
        };
        let pairs = settings.query_pairs();
        assert!(pairs.contains(&("forward", "false".to_owned())));
        assert!(pairs.contains(&("backward", "true".to_owned())));
        assert!(pairs.contains(&("n", "50".to_owned())));
        assert!(pairs.contains(&("maxHops", "8".to_owned())));
    }

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("Forward".parse::<TraversalDirection>(), Ok(TraversalDirection::Forward));
        assert!("sideways".parse::<TraversalDirection>().is_err());
    }
}
