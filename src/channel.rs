//! Channel roles and their loudness weights

/// The broadcast-channel role assigned to an input channel index.
///
/// Determines the weight applied to that channel's squared, K-weighted
/// samples before they are summed into a block's mean-square energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelRole {
    /// Not counted toward loudness (e.g. an LFE channel). Weight 0.
    #[default]
    Unused,
    /// Left channel. Weight 1.0.
    Left,
    /// Right channel. Weight 1.0.
    Right,
    /// Center channel. Weight 1.0.
    Center,
    /// Left surround channel. Weight 1.41.
    LeftSurround,
    /// Right surround channel. Weight 1.41.
    RightSurround,
    /// A channel whose energy should be counted twice (e.g. a mono signal
    /// duplicated into a stereo pair and measured on one leg).
    DualMono,
}

impl ChannelRole {
    /// The default role reference implementations assign to an unconfigured
    /// channel index: 0→Left, 1→Right, 2→Center, 3→Unused, 4→LeftSurround,
    /// 5→RightSurround, everything else→Unused.
    pub fn default_for_index(index: u32) -> ChannelRole {
        match index {
            0 => ChannelRole::Left,
            1 => ChannelRole::Right,
            2 => ChannelRole::Center,
            3 => ChannelRole::Unused,
            4 => ChannelRole::LeftSurround,
            5 => ChannelRole::RightSurround,
            _ => ChannelRole::Unused,
        }
    }

    /// The multiplier applied to this channel's squared K-weighted samples
    /// before summing into a block's mean-square energy. `DualMono` doubles
    /// the weight of a single-channel role (treated as Left's weight counted
    /// twice) rather than introducing a distinct physical weight.
    pub fn weight(self) -> f64 {
        match self {
            ChannelRole::Unused => 0.0,
            ChannelRole::Left | ChannelRole::Right | ChannelRole::Center => 1.0,
            ChannelRole::LeftSurround | ChannelRole::RightSurround => 1.41,
            ChannelRole::DualMono => 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_matches_reference_layout() {
        assert_eq!(ChannelRole::default_for_index(0), ChannelRole::Left);
        assert_eq!(ChannelRole::default_for_index(1), ChannelRole::Right);
        assert_eq!(ChannelRole::default_for_index(2), ChannelRole::Center);
        assert_eq!(ChannelRole::default_for_index(3), ChannelRole::Unused);
        assert_eq!(ChannelRole::default_for_index(4), ChannelRole::LeftSurround);
        assert_eq!(ChannelRole::default_for_index(5), ChannelRole::RightSurround);
        assert_eq!(ChannelRole::default_for_index(6), ChannelRole::Unused);
        assert_eq!(ChannelRole::default_for_index(99), ChannelRole::Unused);
    }

    #[test]
    fn weights_match_spec() {
        assert_eq!(ChannelRole::Unused.weight(), 0.0);
        assert_eq!(ChannelRole::Left.weight(), 1.0);
        assert_eq!(ChannelRole::Right.weight(), 1.0);
        assert_eq!(ChannelRole::Center.weight(), 1.0);
        assert_eq!(ChannelRole::LeftSurround.weight(), 1.41);
        assert_eq!(ChannelRole::RightSurround.weight(), 1.41);
        assert_eq!(ChannelRole::DualMono.weight(), 2.0);
    }
}
