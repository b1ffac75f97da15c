// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure.
// It is used for successor shuffling, rollout sampling and trial ids, where a
// seed must make a whole trial reproducible.

use crate::graph::StateId;

/// Randomization collaborator used by the graph and the trial controller.
pub trait Randomizer {
    /// Uniform in-place permutation.
    fn permute(&mut self, items: &mut [StateId]);

    /// Uniform single-element sample. `None` for an empty slice.
    fn sample(&mut self, items: &[StateId]) -> Option<StateId>;
}

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: seed }
    }

    /// Seed from the wall clock, for trials that do not pin a seed.
    pub fn from_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos ^ 0xD1B5_4A32_D192_ED03)
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    #[inline]
    pub fn gen_range_usize(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        let span = (high - low) as u64;
        let v = self.next_u64() % span;
        low + v as usize
    }

    /// 128-bit hex id, formatted like a UUID so log consumers can treat it as one.
    pub fn trial_id(&mut self) -> String {
        let a = self.next_u64();
        let b = self.next_u64();
        format!(
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (a >> 32) as u32,
            (a >> 16) as u16,
            a as u16,
            (b >> 48) as u16,
            b & 0xFFFF_FFFF_FFFF
        )
    }
}

impl Randomizer for Prng {
    fn permute(&mut self, items: &mut [StateId]) {
        // Fisher-Yates.
        for i in (1..items.len()).rev() {
            let j = self.gen_range_usize(0, i + 1);
            items.swap(i, j);
        }
    }

    fn sample(&mut self, items: &[StateId]) -> Option<StateId> {
        if items.is_empty() {
            return None;
        }
        Some(items[self.gen_range_usize(0, items.len())])
    }
}

/// Replays a fixed list of indices; used to make rollouts scriptable.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandomizer {
    picks: Vec<usize>,
    cursor: usize,
}

impl ScriptedRandomizer {
    pub fn new(picks: Vec<usize>) -> Self {
        Self { picks, cursor: 0 }
    }

    fn next_pick(&mut self) -> usize {
        let pick = self.picks.get(self.cursor).copied().unwrap_or(0);
        self.cursor += 1;
        pick
    }
}

impl Randomizer for ScriptedRandomizer {
    fn permute(&mut self, items: &mut [StateId]) {
        // Rotate left by the scripted amount.
        if !items.is_empty() {
            let k = self.next_pick() % items.len();
            items.rotate_left(k);
        }
    }

    fn sample(&mut self, items: &[StateId]) -> Option<StateId> {
        if items.is_empty() {
            return None;
        }
        let pick = self.next_pick() % items.len();
        Some(items[pick])
    }
}
