use crate::song::TimeSignature;

/// Position in measures, beats and ticks, all zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbt {
    pub measure: i64,
    pub beat: i64,
    pub tick: i64,
}

impl Mbt {
    /// Resolves `tick` against the signature changes in effect.
    ///
    /// A signature change always starts a new measure. Without any change the
    /// song is in 4/4.
    pub fn from_tick(signatures: &[TimeSignature], tick: i64, timebase: u32) -> Self {
        let timebase = i64::from(timebase.max(1));
        let mut start_tick = 0;
        let mut start_measure = 0;
        let mut numerator = 4;
        let mut denominator = 4;
        for signature in signatures {
            if signature.tick > tick {
                break;
            }
            let per_measure = ticks_per_measure(timebase, numerator, denominator);
            let elapsed = (signature.tick - start_tick).max(0);
            start_measure += (elapsed + per_measure - 1) / per_measure;
            start_tick = signature.tick;
            numerator = i64::from(signature.numerator.max(1));
            denominator = i64::from(signature.denominator.max(1));
        }
        let per_beat = ticks_per_beat(timebase, denominator);
        let per_measure = per_beat * numerator;
        let offset = (tick - start_tick).max(0);
        Self {
            measure: start_measure + offset / per_measure,
            beat: (offset % per_measure) / per_beat,
            tick: offset % per_beat,
        }
    }
}

impl std::fmt::Display for Mbt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}:{:02}:{:03}", self.measure + 1, self.beat + 1, self.tick)
    }
}

fn ticks_per_beat(timebase: i64, denominator: i64) -> i64 {
    (timebase * 4 / denominator).max(1)
}

fn ticks_per_measure(timebase: i64, numerator: i64, denominator: i64) -> i64 {
    ticks_per_beat(timebase, denominator) * numerator
}

/// `MMMM:BB:TTT`, measure and beat counted from one.
pub fn mbt_string(signatures: &[TimeSignature], tick: i64, timebase: u32) -> String {
    Mbt::from_tick(signatures, tick, timebase).to_string()
}
