use std::fmt;
use std::str::FromStr;

use feeds::HazardKind;
use serde::{Deserialize, Serialize};

/// User-selectable hazard layer. Exactly one is selected at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerId {
    All,
    Flood,
    Landslide,
    Seismic,
    Weather,
    Fire,
}

impl LayerId {
    /// Order used when cycling with next/previous.
    pub const CYCLE: [LayerId; 6] = [
        LayerId::All,
        LayerId::Weather,
        LayerId::Flood,
        LayerId::Landslide,
        LayerId::Fire,
        LayerId::Seismic,
    ];

    /// Hazard kinds whose sources this layer queries.
    pub fn kinds(self) -> &'static [HazardKind] {
        match self {
            LayerId::All => &HazardKind::ALL,
            LayerId::Flood => &[HazardKind::Flood],
            LayerId::Landslide => &[HazardKind::Landslide],
            LayerId::Seismic => &[HazardKind::Seismic],
            LayerId::Weather => &[HazardKind::Weather],
            LayerId::Fire => &[HazardKind::Fire],
        }
    }

    pub fn includes(self, kind: HazardKind) -> bool {
        self.kinds().contains(&kind)
    }

    pub fn for_kind(kind: HazardKind) -> Self {
        match kind {
            HazardKind::Flood => LayerId::Flood,
            HazardKind::Landslide => LayerId::Landslide,
            HazardKind::Seismic => LayerId::Seismic,
            HazardKind::Weather => LayerId::Weather,
            HazardKind::Fire => LayerId::Fire,
        }
    }

    pub fn next(self) -> Self {
        let i = self.cycle_index();
        Self::CYCLE[(i + 1) % Self::CYCLE.len()]
    }

    pub fn previous(self) -> Self {
        let i = self.cycle_index();
        Self::CYCLE[(i + Self::CYCLE.len() - 1) % Self::CYCLE.len()]
    }

    fn cycle_index(self) -> usize {
        Self::CYCLE.iter().position(|l| *l == self).unwrap_or(0)
    }

    pub fn name(self) -> &'static str {
        match self {
            LayerId::All => "all",
            LayerId::Flood => "flood",
            LayerId::Landslide => "landslide",
            LayerId::Seismic => "seismic",
            LayerId::Weather => "weather",
            LayerId::Fire => "fire",
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CYCLE
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown layer: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::LayerId;
    use feeds::HazardKind;

    #[test]
    fn all_implicates_every_kind() {
        assert_eq!(LayerId::All.kinds().len(), 5);
        assert!(LayerId::All.includes(HazardKind::Seismic));
        assert_eq!(LayerId::Flood.kinds(), &[HazardKind::Flood]);
        assert!(!LayerId::Flood.includes(HazardKind::Weather));
    }

    #[test]
    fn cycling_wraps_both_ways() {
        let mut layer = LayerId::All;
        for _ in 0..LayerId::CYCLE.len() {
            layer = layer.next();
        }
        assert_eq!(layer, LayerId::All);
        assert_eq!(LayerId::All.previous(), LayerId::Seismic);
        assert_eq!(LayerId::All.next(), LayerId::Weather);
        assert_eq!(LayerId::Seismic.next(), LayerId::All);
    }

    #[test]
    fn parses_names() {
        assert_eq!("Landslide".parse::<LayerId>(), Ok(LayerId::Landslide));
        assert!("volcano".parse::<LayerId>().is_err());
        for kind in HazardKind::ALL {
            assert_eq!(LayerId::for_kind(kind).kinds(), &[kind]);
        }
    }
}
