use core::fmt;

/// Runtime timing region.
///
/// The core is NTSC-only: PAL and Dendy timings are a non-goal. This type
/// still names the alternatives the way a region-aware core would, so a
/// future PAL mode has an obvious home without disturbing callers that only
/// ever see `Ntsc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    #[default]
    Ntsc,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Region::Ntsc => "ntsc",
        })
    }
}
