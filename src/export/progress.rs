//! Lock-free progress shared between the export worker and the job driver.

use std::sync::atomic::{AtomicU64, Ordering};

/// Highest value reported while a job is still running. 1.0 is reserved for
/// the driver, right before it reports success.
pub const RUNNING_CEILING: f64 = 0.99;

/// An `f64` in `[0, 1]` stored as bits in an `AtomicU64`.
///
/// Single writer (the worker), any number of readers. Writes never move the
/// value backwards.
#[derive(Debug, Default)]
pub struct ProgressCell {
    bits: AtomicU64,
}

impl ProgressCell {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Record `value`, clamped to `[0, RUNNING_CEILING]`. Ignored if it is
    /// lower than what was already recorded, or NaN.
    pub fn advance(&self, value: f64) {
        if value.is_nan() {
            return;
        }
        let value = value.clamp(0.0, RUNNING_CEILING);
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (value > f64::from_bits(current)).then(|| value.to_bits())
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        assert_eq!(ProgressCell::new().get(), 0.0);
    }

    #[test]
    fn test_never_moves_backwards() {
        let cell = ProgressCell::new();
        cell.advance(0.4);
        cell.advance(0.2);
        assert_eq!(cell.get(), 0.4);
        cell.advance(f64::NAN);
        assert_eq!(cell.get(), 0.4);
        cell.advance(0.5);
        assert_eq!(cell.get(), 0.5);
    }

    #[test]
    fn test_clamped_below_one() {
        let cell = ProgressCell::new();
        cell.advance(3.0);
        assert_eq!(cell.get(), RUNNING_CEILING);
        cell.advance(-1.0);
        assert_eq!(cell.get(), RUNNING_CEILING);
    }

    #[test]
    fn test_concurrent_readers() {
        let cell = std::sync::Arc::new(ProgressCell::new());
        let reader = {
            let cell = cell.clone();
            std::thread::spawn(move || {
                let mut last = 0.0;
                for _ in 0..1000 {
                    let v = cell.get();
                    assert!(v >= last);
                    last = v;
                }
            })
        };
        for i in 0..1000 {
            cell.advance(i as f64 / 1000.0);
        }
        reader.join().unwrap();
    }
}
