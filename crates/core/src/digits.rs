use crate::template::DigitSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitCounter {
    spec: DigitSpec,
    current: i64,
    width: usize,
}

impl DigitCounter {
    pub fn new(spec: DigitSpec) -> Self {
        Self {
            spec,
            current: spec.start,
            width: spec.end.to_string().len(),
        }
    }

    pub fn next_token(&mut self) -> String {
        let token = pad(self.current, self.width);
        if self.current < self.spec.end {
            self.current = self.current.saturating_add(self.spec.increment);
        }
        token
    }

    pub fn reset(&mut self) {
        self.current = self.spec.start;
    }

    pub fn current(&self) -> i64 {
        self.current
    }
}

#[derive(Debug, Clone, Default)]
pub struct DigitSequence {
    counters: Vec<DigitCounter>,
}

impl DigitSequence {
    pub fn new(specs: &[DigitSpec]) -> Self {
        Self {
            counters: specs.iter().copied().map(DigitCounter::new).collect(),
        }
    }

    pub fn next_token(&mut self, slot: usize) -> Option<String> {
        self.counters.get_mut(slot).map(DigitCounter::next_token)
    }

    pub fn reset(&mut self) {
        for counter in &mut self.counters {
            counter.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

fn pad(value: i64, width: usize) -> String {
    if value < 0 {
        format!("-{:0>w$}", value.unsigned_abs(), w = width.saturating_sub(1))
    } else {
        format!("{:0>w$}", value, w = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(start: i64, increment: i64, end: i64) -> DigitSpec {
        DigitSpec {
            start,
            increment,
            end,
        }
    }

    fn take(counter: &mut DigitCounter, n: usize) -> Vec<String> {
        (0..n).map(|_| counter.next_token()).collect()
    }

    #[test]
    fn pads_to_width_of_end() {
        let mut counter = DigitCounter::new(spec(1, 1, 100));
        assert_eq!(take(&mut counter, 3), vec!["001", "002", "003"]);
    }

    #[test]
    fn holds_once_end_is_reached() {
        let mut counter = DigitCounter::new(spec(0, 2, 6));
        assert_eq!(take(&mut counter, 6), vec!["0", "2", "4", "6", "6", "6"]);
    }

    #[test]
    fn overshoot_is_not_clamped() {
        let mut counter = DigitCounter::new(spec(0, 4, 6));
        assert_eq!(take(&mut counter, 4), vec!["0", "4", "8", "8"]);
        assert_eq!(counter.current(), 8);
    }

    #[test]
    fn negative_increment_starting_above_end_never_advances() {
        let mut counter = DigitCounter::new(spec(10, -1, 0));
        assert_eq!(take(&mut counter, 3), vec!["10", "10", "10"]);
    }

    #[test]
    fn negative_values_keep_sign_before_padding() {
        let mut counter = DigitCounter::new(spec(-3, 1, 100));
        assert_eq!(take(&mut counter, 4), vec!["-03", "-02", "-01", "000"]);
    }

    #[test]
    fn reset_restores_first_output() {
        let mut sequence = DigitSequence::new(&[spec(5, 5, 50), spec(0, 1, 9)]);
        let first = (sequence.next_token(0), sequence.next_token(1));
        for _ in 0..20 {
            sequence.next_token(0);
            sequence.next_token(1);
        }
        sequence.reset();
        assert_eq!((sequence.next_token(0), sequence.next_token(1)), first);
        assert_eq!(first, (Some("05".to_string()), Some("0".to_string())));
    }

    #[test]
    fn occurrences_are_independent() {
        let mut sequence = DigitSequence::new(&[spec(0, 1, 9), spec(0, 1, 9)]);
        assert_eq!(sequence.next_token(0).as_deref(), Some("0"));
        assert_eq!(sequence.next_token(0).as_deref(), Some("1"));
        assert_eq!(sequence.next_token(1).as_deref(), Some("0"));
        assert_eq!(sequence.next_token(2), None);
    }
}
