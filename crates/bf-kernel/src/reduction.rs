//! Max-change reduction.
//!
//! Each node's |ΔT| lands in slot `node_index % REDUCTION_SLOTS`; the
//! iteration's convergence signal is the max over slots. The GPU kernel keeps
//! the same slots as atomics over the f32 bit pattern.

/// Number of accumulator slots. Equal to the GPU reduction workgroup width.
pub const REDUCTION_SLOTS: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub struct ChangeAccumulator {
    slots: Vec<f64>,
}

impl Default for ChangeAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeAccumulator {
    pub fn new() -> Self {
        Self {
            slots: vec![0.0; REDUCTION_SLOTS],
        }
    }

    /// Reset every slot. A stale slot would mask convergence.
    pub fn zero(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = 0.0);
    }

    #[inline]
    pub fn record(&mut self, node_index: usize, change: f64) {
        let slot = &mut self.slots[node_index % REDUCTION_SLOTS];
        *slot = slot.max(change);
    }

    pub fn merge(&mut self, other: &ChangeAccumulator) {
        for (a, b) in self.slots.iter_mut().zip(&other.slots) {
            *a = a.max(*b);
        }
    }

    pub fn max(&self) -> f64 {
        self.slots.iter().copied().fold(0.0, f64::max)
    }

    pub fn slots(&self) -> &[f64] {
        &self.slots
    }
}

/// Max |next − prev| over two equal-length fields, through the slot reduction.
pub fn max_change(prev: &[f64], next: &[f64]) -> f64 {
    let mut acc = ChangeAccumulator::new();
    for (idx, (a, b)) in prev.iter().zip(next).enumerate() {
        acc.record(idx, (b - a).abs());
    }
    acc.max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_perturbation_is_found() {
        let prev = vec![283.15; 1000];
        let mut next = prev.clone();
        next[777] += 0.375;
        next[12] -= 0.125;
        assert_eq!(max_change(&prev, &next), (prev[777] + 0.375 - prev[777]).abs());
    }

    #[test]
    fn slots_alias_by_modulo() {
        let mut acc = ChangeAccumulator::new();
        acc.record(3, 1.0);
        acc.record(3 + REDUCTION_SLOTS, 2.0);
        acc.record(4, 0.5);
        assert_eq!(acc.slots()[3], 2.0);
        assert_eq!(acc.slots()[4], 0.5);
        assert_eq!(acc.max(), 2.0);
    }

    #[test]
    fn zero_clears_previous_iteration() {
        let mut acc = ChangeAccumulator::new();
        acc.record(10, 4.0);
        acc.zero();
        acc.record(11, 1e-6);
        assert_eq!(acc.max(), 1e-6);
    }

    #[test]
    fn merge_takes_slotwise_max() {
        let mut a = ChangeAccumulator::new();
        let mut b = ChangeAccumulator::new();
        a.record(0, 1.0);
        b.record(0, 3.0);
        b.record(1, 0.5);
        a.merge(&b);
        assert_eq!(a.slots()[0], 3.0);
        assert_eq!(a.slots()[1], 0.5);
    }
}
