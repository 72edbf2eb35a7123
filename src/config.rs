use log::warn;

pub type FrameId = u32;
pub type PageId = u32;

pub const PAGE_SIZE: usize = 4096;

pub const DEFAULT_NUM_FRAMES: usize = 8;
pub const DEFAULT_K: usize = 2;

const NUM_FRAMES_VAR: &str = "GEODE_NUM_FRAMES";
const K_DIST_VAR: &str = "GEODE_K_DIST";

/// Sizing of the k-distance replacer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacerOptions {
    // Number of frames the replacer may track
    pub num_frames: usize,
    // History window per frame
    pub k: usize,
}

impl Default for ReplacerOptions {
    fn default() -> Self {
        Self {
            num_frames: DEFAULT_NUM_FRAMES,
            k: DEFAULT_K,
        }
    }
}

impl ReplacerOptions {
    /// Reads `GEODE_NUM_FRAMES` and `GEODE_K_DIST`, keeping the default for
    /// anything missing, unparsable or zero.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            num_frames: read_positive(NUM_FRAMES_VAR, defaults.num_frames),
            k: read_positive(K_DIST_VAR, defaults.k),
        }
    }
}

fn read_positive(var: &str, default: usize) -> usize {
    let Ok(raw) = std::env::var(var) else {
        return default;
    };

    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => value,
        _ => {
            warn!("ignoring {}={:?}, using {}", var, raw, default);
            default
        }
    }
}
