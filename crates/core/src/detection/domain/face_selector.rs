use std::fmt;
use std::str::FromStr;

use crate::shared::region::Region;

/// Which detected face the monitor follows when a frame has several.
///
/// Only one face feeds the monitor per frame so that eye signals from
/// different people never share a closure counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaceSelection {
    /// Biggest box by area; the earliest detection wins ties.
    #[default]
    Largest,
    First,
    Last,
}

impl FaceSelection {
    pub const ALL: &[FaceSelection] = &[
        FaceSelection::Largest,
        FaceSelection::First,
        FaceSelection::Last,
    ];

    pub fn select<'a>(&self, regions: &'a [Region]) -> Option<&'a Region> {
        match self {
            FaceSelection::First => regions.first(),
            FaceSelection::Last => regions.last(),
            FaceSelection::Largest => regions.iter().reduce(|best, r| {
                if r.area() > best.area() {
                    r
                } else {
                    best
                }
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FaceSelection::Largest => "largest",
            FaceSelection::First => "first",
            FaceSelection::Last => "last",
        }
    }
}

impl fmt::Display for FaceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "largest" => Ok(FaceSelection::Largest),
            "first" => Ok(FaceSelection::First),
            "last" => Ok(FaceSelection::Last),
            other => Err(format!(
                "face selection must be one of: largest, first, last, got '{other}'"
            )),
        }
    }
}
