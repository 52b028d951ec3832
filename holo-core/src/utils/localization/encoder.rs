/// Extends a fixed-width hardware counter into an unbounded count.
///
/// Consecutive raw readings are assumed to be less than half the counter
/// range apart, so each delta is recovered by sign-extending the wrapped
/// difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowEncoder {
    bits: u8,
    last_raw: Option<i64>,
    count: i64,
}

impl OverflowEncoder {
    /// `bits` is clamped to `1..=64`.
    pub fn new(bits: u8) -> Self {
        Self {
            bits: bits.clamp(1, 64),
            last_raw: None,
            count: 0,
        }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Feed the latest raw reading and return the accumulated count.
    pub fn update(
        &mut self,
        raw: i64,
    ) -> i64 {
        self.count = match self.last_raw {
            None => self.sign_extend(raw),
            Some(last) => self.count.wrapping_add(self.sign_extend(raw.wrapping_sub(last))),
        };
        self.last_raw = Some(raw);
        self.count
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    /// Forget history; the next reading starts a fresh count.
    pub fn reset(&mut self) {
        self.last_raw = None;
        self.count = 0;
    }

    fn sign_extend(
        &self,
        value: i64,
    ) -> i64 {
        let shift = 64 - u32::from(self.bits);
        value.wrapping_shl(shift) >> shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_bit_wrap_forward() {
        let mut enc = OverflowEncoder::new(16);
        assert_eq!(enc.update(65_530), -6);
        // 65530 -> 4 is +10 ticks across the wrap
        assert_eq!(enc.update(4), 4);
        assert_eq!(enc.update(1_004), 1_004);
    }

    #[test]
    fn sixteen_bit_wrap_backward() {
        let mut enc = OverflowEncoder::new(16);
        enc.update(3);
        assert_eq!(enc.update(65_535), -1);
        assert_eq!(enc.update(65_000), -536);
    }

    #[test]
    fn accumulates_past_counter_range() {
        let mut enc = OverflowEncoder::new(8);
        let mut raw: i64 = 0;
        enc.update(raw);
        for _ in 0..20 {
            raw = (raw + 100) % 256;
            enc.update(raw);
        }
        assert_eq!(enc.count(), 2_000);
    }

    #[test]
    fn full_width_passes_through() {
        let mut enc = OverflowEncoder::new(64);
        assert_eq!(enc.update(-42), -42);
        assert_eq!(enc.update(1_000_000), 1_000_000);
        enc.reset();
        assert_eq!(enc.update(7), 7);
    }
}
