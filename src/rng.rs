#[derive(Clone, Debug)]
pub struct SimRng {
    state: u32,
}

impl SimRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    // mulberry32
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6d2b79f5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Inclusive on both ends.
    pub fn int(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        min + self.below(max as u64 - min as u64 + 1) as u32
    }

    pub fn chance(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.below(len as u64) as usize
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.pick_index(items.len()))
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for idx in (1..items.len()).rev() {
            let swap_with = self.pick_index(idx + 1);
            items.swap(idx, swap_with);
        }
    }

    // multiply-shift into 0..bound, bound <= 2^32
    fn below(&mut self, bound: u64) -> u64 {
        (self.next_u32() as u64 * bound) >> 32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_replays_same_sequence() {
        let mut a = SimRng::new(42);
        let mut b = SimRng::new(42);
        for _ in 0..32 {
            assert_eq!(a.next_f32(), b.next_f32());
        }
    }

    #[test]
    fn int_stays_in_range() {
        let mut rng = SimRng::new(7);
        for _ in 0..500 {
            let value = rng.int(5, 30);
            assert!((5..=30).contains(&value));
        }
        assert_eq!(rng.int(9, 3), 9);
    }

    #[test]
    fn floats_stay_below_one_so_certain_chances_always_hit() {
        let mut rng = SimRng::new(u32::MAX);
        for _ in 0..1000 {
            let value = rng.next_f32();
            assert!((0.0..1.0).contains(&value));
        }
        assert!((0..100).all(|_| rng.chance(1.0)));
        assert!((0..100).all(|_| !rng.chance(0.0)));
        rng.int(0, u32::MAX);
    }

    #[test]
    fn shuffle_keeps_every_element() {
        let mut rng = SimRng::new(3);
        let mut items: Vec<u32> = (0..20).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
        assert_eq!(rng.pick::<u32>(&[]), None);
    }
}
