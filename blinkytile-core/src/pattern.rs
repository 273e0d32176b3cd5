//! Fallback pattern shown when no animations are stored

use blinkytile_hal::Rgb;

/// Level of a lit LED in the count-up pattern
pub const COUNT_UP_LEVEL: u8 = 32;

/// Built-in pattern rendered every tick in place of stored animations
pub trait FallbackPattern {
    /// Render the next step into `pixels`
    fn render(&mut self, pixels: &mut [Rgb]);
}

/// Binary counter across the strip
///
/// LED `i` shows bit `i` of the counter in dim white. The counter advances
/// once every `divider` renders, so LED 0 blinks fastest and the strip never
/// goes fully dark for long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CountUpPattern {
    counter: u32,
    renders: u32,
    divider: u32,
}

impl Default for CountUpPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl CountUpPattern {
    /// Advance on every render
    pub const fn new() -> Self {
        Self::with_divider(1)
    }

    /// Advance once every `divider` renders (0 is treated as 1)
    pub const fn with_divider(divider: u32) -> Self {
        Self {
            counter: 0,
            renders: 0,
            divider: if divider == 0 { 1 } else { divider },
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }
}

impl FallbackPattern for CountUpPattern {
    fn render(&mut self, pixels: &mut [Rgb]) {
        let lit = Rgb::new(COUNT_UP_LEVEL, COUNT_UP_LEVEL, COUNT_UP_LEVEL);
        for (bit, pixel) in pixels.iter_mut().enumerate() {
            let on = bit < 32 && (self.counter >> bit) & 1 == 1;
            *pixel = if on { lit } else { Rgb::default() };
        }

        self.renders += 1;
        if self.renders >= self.divider {
            self.renders = 0;
            self.counter = self.counter.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ON: Rgb = Rgb::new(COUNT_UP_LEVEL, COUNT_UP_LEVEL, COUNT_UP_LEVEL);
    const OFF: Rgb = Rgb::new(0, 0, 0);

    #[test]
    fn test_counts_in_binary() {
        let mut pattern = CountUpPattern::new();
        let mut pixels = [OFF; 3];

        pattern.render(&mut pixels);
        assert_eq!(pixels, [OFF, OFF, OFF]);
        pattern.render(&mut pixels);
        assert_eq!(pixels, [ON, OFF, OFF]);
        pattern.render(&mut pixels);
        assert_eq!(pixels, [OFF, ON, OFF]);
        pattern.render(&mut pixels);
        assert_eq!(pixels, [ON, ON, OFF]);
    }

    #[test]
    fn test_divider_slows_counter() {
        let mut pattern = CountUpPattern::with_divider(3);
        let mut pixels = [OFF; 1];
        for _ in 0..6 {
            pattern.render(&mut pixels);
        }
        assert_eq!(pattern.counter(), 2);
    }

    #[test]
    fn test_long_strip_beyond_counter_width() {
        let mut pattern = CountUpPattern::new();
        let mut pixels = [ON; 40];
        pattern.render(&mut pixels);
        assert!(pixels.iter().all(|pixel| *pixel == OFF));
    }
}
