use std::collections::VecDeque;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::timing::Speed;

/// Durations at or below this magnitude are treated as sampling
/// glitches and absorbed into the neighboring segment. Roughly one
/// analysis frame of a typical audio front end.
const DEFAULT_NOISE_THRESHOLD_MS: f64 = 5.4;

/// Ring buffer capacity for the dit and Farnsworth-dit estimates.
const ESTIMATE_BUFFER_SIZE: usize = 30;

/// One decoded increment, delivered per flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoderEvent {
    /// The raw signed durations consumed by this flush.
    pub timings: Vec<f64>,
    /// Classified symbols: `.`/`-` plus ` ` (char gap) and `/` (word gap).
    pub morse: String,
    /// Text decoded from this increment; `#` marks unreadable patterns.
    pub message: String,
}

/// Fired on every speed re-estimate of the adaptive decoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedEvent {
    pub wpm: f64,
    pub fwpm: f64,
}

type MessageCallback = Box<dyn FnMut(&DecoderEvent)>;
type SpeedCallback = Box<dyn FnMut(SpeedEvent)>;

/// Streaming decoder: a reducer over a live stream of signed
/// millisecond durations (positive = tone, negative = silence).
///
/// Classification thresholds adapt to the sender: every classified
/// duration contributes a dit-length (or Farnsworth-dit-length)
/// estimate to a bounded buffer, and the running speed is a linearly
/// weighted moving average over it - newest samples weigh most. Set
/// `lock_speed` for a fixed-speed decoder.
///
/// Single logical call sequence only; drive it from one consumer.
pub struct MorseDecoder {
    dict: Dictionary,
    dit_ms: f64,
    fdit_ms: f64,
    noise_threshold_ms: f64,
    lock_speed: bool,
    unused_times: Vec<f64>,
    timings: Vec<f64>,
    morse: String,
    message: String,
    dits: VecDeque<Option<f64>>,
    fdits: VecDeque<Option<f64>>,
    message_callback: Option<MessageCallback>,
    speed_callback: Option<SpeedCallback>,
}

impl MorseDecoder {
    pub fn new(dict: Dictionary, speed: Speed) -> Self {
        let dit_ms = speed.dit_ms();
        let fdit_ms = dit_ms * speed.farnsworth_ratio();
        MorseDecoder {
            dict,
            dit_ms,
            fdit_ms,
            noise_threshold_ms: DEFAULT_NOISE_THRESHOLD_MS,
            lock_speed: false,
            unused_times: Vec::new(),
            timings: Vec::new(),
            morse: String::new(),
            message: String::new(),
            dits: VecDeque::from(vec![None; ESTIMATE_BUFFER_SIZE]),
            fdits: VecDeque::from(vec![None; ESTIMATE_BUFFER_SIZE]),
            message_callback: None,
            speed_callback: None,
        }
    }

    /// Disable (or re-enable) speed adaptation.
    pub fn set_lock_speed(&mut self, lock: bool) {
        self.lock_speed = lock;
    }

    pub fn set_noise_threshold(&mut self, threshold_ms: f64) {
        self.noise_threshold_ms = threshold_ms.abs();
    }

    pub fn on_message(&mut self, callback: impl FnMut(&DecoderEvent) + 'static) {
        self.message_callback = Some(Box::new(callback));
    }

    pub fn on_speed(&mut self, callback: impl FnMut(SpeedEvent) + 'static) {
        self.speed_callback = Some(Box::new(callback));
    }

    /// Everything decoded so far.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Classified symbols so far.
    pub fn morse(&self) -> &str {
        &self.morse
    }

    /// Every duration consumed by a flush so far.
    pub fn timings(&self) -> &[f64] {
        &self.timings
    }

    /// Current speed estimate.
    pub fn speed(&self) -> Speed {
        let wpm = 1200.0 / self.dit_ms;
        // Inverse of the Farnsworth length formula over the 50-unit
        // reference word: fdit = (60000/fwpm - 31*dit) / 19.
        let fwpm = 60_000.0 / (19.0 * self.fdit_ms.max(self.dit_ms) + 31.0 * self.dit_ms);
        Speed::new(wpm, fwpm)
    }

    /// Boundary between a dit and a dah (and between an intra-character
    /// gap and a real space): the midpoint of 1 and 3 dits.
    fn dit_dah_threshold(&self) -> f64 {
        self.dit_ms * 2.0
    }

    /// Boundary between an inter-character and an inter-word gap: the
    /// midpoint of 3 and 7 Farnsworth dits.
    fn space_threshold(&self) -> f64 {
        self.fdit_ms.max(self.dit_ms) * 5.0
    }

    /// Feed one signed duration. May trigger a flush (a confirmed
    /// character or word boundary), in which case the decoded increment
    /// is returned and the message callback invoked.
    pub fn add_timing(&mut self, duration_ms: f64) -> Option<DecoderEvent> {
        if duration_ms == 0.0 || !duration_ms.is_finite() {
            return None;
        }
        match self.unused_times.last_mut() {
            Some(last) if last.signum() == duration_ms.signum() => {
                // One physical segment split by the sampler.
                *last += duration_ms;
            }
            Some(last) if duration_ms.abs() <= self.noise_threshold_ms => {
                // Spurious flicker: absorb it into the current segment.
                trace!("absorbing {duration_ms}ms glitch");
                *last -= duration_ms;
            }
            Some(_) => self.unused_times.push(duration_ms),
            None => {
                if duration_ms.abs() > self.noise_threshold_ms {
                    self.unused_times.push(duration_ms);
                }
            }
        }

        match self.unused_times.last() {
            Some(&last) if last < 0.0 && -last > self.dit_dah_threshold() => self.emit(true),
            _ => None,
        }
    }

    /// Force-finalize the pending buffer at end of stream, including a
    /// trailing silence that has not yet grown past the word-gap
    /// threshold.
    pub fn flush(&mut self) -> Option<DecoderEvent> {
        self.emit(false)
    }

    /// Shared finalization. With `hold_trailing_silence` (the automatic
    /// flush path) a trailing silence that could still grow into a word
    /// gap is held back for the next call.
    fn emit(&mut self, hold_trailing_silence: bool) -> Option<DecoderEvent> {
        // A word break was already emitted (or nothing has been yet);
        // its continuation carries no information.
        if (self.message.is_empty() || self.message.ends_with(' '))
            && self.unused_times.first().is_some_and(|&d| d < 0.0)
        {
            self.unused_times.remove(0);
        }
        if self.unused_times.is_empty() {
            return None;
        }

        let mut held = None;
        if hold_trailing_silence {
            if let Some(&last) = self.unused_times.last() {
                if last < 0.0 && -last < self.space_threshold() {
                    held = self.unused_times.pop();
                }
            }
        }
        if self.unused_times.is_empty() {
            self.unused_times.extend(held);
            return None;
        }

        let consumed = std::mem::take(&mut self.unused_times);
        let mut morse_inc = String::new();
        for &duration in &consumed {
            let symbol = self.classify(duration);
            trace!("{duration}ms -> {symbol:?}");
            morse_inc.push_str(symbol);
            if !self.lock_speed {
                self.add_estimate(duration, symbol);
            }
        }

        let mut text_inc = String::new();
        let mut pattern = String::new();
        for symbol in morse_inc.chars() {
            match symbol {
                '.' | '-' => pattern.push(symbol),
                ' ' => Self::decode_pattern(&self.dict, &mut pattern, &mut text_inc),
                '/' => {
                    Self::decode_pattern(&self.dict, &mut pattern, &mut text_inc);
                    text_inc.push(' ');
                }
                _ => {}
            }
        }
        Self::decode_pattern(&self.dict, &mut pattern, &mut text_inc);

        self.unused_times.extend(held);
        self.timings.extend_from_slice(&consumed);
        self.morse.push_str(&morse_inc);
        self.message.push_str(&text_inc);
        debug!("flush: {morse_inc:?} -> {text_inc:?}");

        let event = DecoderEvent {
            timings: consumed,
            morse: morse_inc,
            message: text_inc,
        };
        if let Some(callback) = self.message_callback.as_mut() {
            callback(&event);
        }
        Some(event)
    }

    fn classify(&self, duration: f64) -> &'static str {
        if duration > 0.0 {
            if duration < self.dit_dah_threshold() {
                "."
            } else {
                "-"
            }
        } else {
            let gap = -duration;
            if gap < self.dit_dah_threshold() {
                // Intra-character gap: structural, no symbol.
                ""
            } else if gap < self.space_threshold() {
                " "
            } else {
                "/"
            }
        }
    }

    fn decode_pattern(dict: &Dictionary, pattern: &mut String, out: &mut String) {
        if pattern.is_empty() {
            return;
        }
        match dict.morse_to_text(pattern) {
            Some(text) => out.push_str(text),
            None => out.push('#'),
        }
        pattern.clear();
    }

    /// Fold one classified duration into the running speed estimate.
    fn add_estimate(&mut self, duration: f64, symbol: &str) {
        match symbol {
            "." => push_sample(&mut self.dits, duration),
            "-" => push_sample(&mut self.dits, duration / 3.0),
            "" => push_sample(&mut self.dits, -duration),
            " " => push_sample(&mut self.fdits, -duration / 3.0),
            _ => return,
        }
        if let Some(dit) = weighted_average(&self.dits) {
            self.dit_ms = dit;
        }
        if let Some(fdit) = weighted_average(&self.fdits) {
            self.fdit_ms = fdit;
        }
        let speed = self.speed();
        debug!(
            "speed estimate: dit {:.1}ms, fdit {:.1}ms ({:.1}/{:.1} wpm)",
            self.dit_ms,
            self.fdit_ms,
            speed.wpm(),
            speed.fwpm()
        );
        if let Some(callback) = self.speed_callback.as_mut() {
            callback(SpeedEvent {
                wpm: speed.wpm(),
                fwpm: speed.fwpm(),
            });
        }
    }
}

fn push_sample(buffer: &mut VecDeque<Option<f64>>, sample: f64) {
    buffer.push_back(Some(sample));
    if buffer.len() > ESTIMATE_BUFFER_SIZE {
        buffer.pop_front();
    }
}

/// Linearly weighted moving average: slot `i` (0 = oldest) weighs
/// `i + 1`; empty slots are skipped.
fn weighted_average(buffer: &VecDeque<Option<f64>>) -> Option<f64> {
    let mut sum = 0.0;
    let mut weights = 0.0;
    for (i, sample) in buffer.iter().enumerate() {
        if let Some(value) = sample {
            let weight = (i + 1) as f64;
            sum += weight * value;
            weights += weight;
        }
    }
    if weights > 0.0 {
        Some(sum / weights)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{get_timings, Speed};
    use crate::translate::load_text;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn decoder() -> MorseDecoder {
        let dict = Dictionary::load("international", &[]).unwrap();
        MorseDecoder::new(dict, Speed::new(20.0, 20.0))
    }

    fn feed(decoder: &mut MorseDecoder, timings: &[f64]) {
        for &t in timings {
            decoder.add_timing(t);
        }
        decoder.flush();
    }

    #[test]
    fn decodes_sos() {
        let mut d = decoder();
        feed(
            &mut d,
            &[
                60.0, -60.0, 60.0, -60.0, 60.0, -180.0, // S
                180.0, -60.0, 180.0, -60.0, 180.0, -180.0, // O
                60.0, -60.0, 60.0, -60.0, 60.0, // S
            ],
        );
        assert_eq!(d.message(), "SOS");
    }

    #[test]
    fn decodes_word_gaps() {
        let mut d = decoder();
        feed(
            &mut d,
            &[60.0, -60.0, 60.0, -420.0, 60.0, -180.0, 60.0],
        );
        assert_eq!(d.message(), "I EE");
    }

    #[test]
    fn zero_duration_is_a_no_op() {
        let mut d = decoder();
        assert!(d.add_timing(0.0).is_none());
        assert_eq!(d.message(), "");
    }

    #[test]
    fn same_sign_segments_merge() {
        let mut d = decoder();
        d.add_timing(100.0);
        d.add_timing(80.0); // same tone, split by the sampler
        d.add_timing(-200.0);
        d.flush();
        assert_eq!(d.message(), "T"); // 180ms, one dah
    }

    #[test]
    fn noise_is_absorbed_into_the_neighbor() {
        let mut d = decoder();
        d.add_timing(40.0);
        d.add_timing(-3.0); // glitch inside the tone
        d.add_timing(25.0);
        d.add_timing(-200.0);
        d.flush();
        // One 68ms dit, not dit-gap-dit.
        assert_eq!(d.morse(), ". ");
        assert_eq!(d.message(), "E");
    }

    #[test]
    fn unknown_pattern_decodes_to_error_marker() {
        let mut d = decoder();
        d.set_lock_speed(true);
        feed(
            &mut d,
            &[
                60.0, -60.0, 60.0, -60.0, 60.0, -60.0, 60.0, -60.0, 60.0, -60.0, 60.0,
                -60.0, 60.0, -60.0, 60.0, // 8 dits: not a character
            ],
        );
        assert_eq!(d.message(), "#");
    }

    #[test]
    fn trailing_char_gap_is_held_back_until_confirmed() {
        let mut d = decoder();
        let event = d.add_timing(60.0);
        assert!(event.is_none());
        let event = d.add_timing(-180.0).expect("char boundary flushes");
        assert_eq!(event.message, "E");
        // The gap itself was not consumed yet.
        assert_eq!(d.morse(), ".");
        assert_eq!(d.timings(), &[60.0]);
        // An explicit end-of-stream flush consumes it.
        d.flush();
        assert_eq!(d.morse(), ". ");
        assert_eq!(d.timings(), &[60.0, -180.0]);
    }

    #[test]
    fn adaptive_speed_converges() {
        let dict = Dictionary::load("international", &[]).unwrap();
        let true_speed = Speed::new(20.0, 20.0);
        let message = load_text("paris paris paris paris", &dict).unwrap();
        let timings = get_timings(&message, &dict, true_speed).unwrap();

        let mut d = MorseDecoder::new(dict, Speed::new(15.0, 15.0));
        let speeds: Rc<RefCell<Vec<f64>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&speeds);
        d.on_speed(move |event| sink.borrow_mut().push(event.wpm));
        for &t in &timings {
            d.add_timing(t);
        }
        d.flush();

        assert_eq!(d.message(), "PARIS PARIS PARIS PARIS");
        let wpm = d.speed().wpm();
        assert!((wpm - 20.0).abs() / 20.0 < 0.02, "converged to {wpm}");
        assert!(!speeds.borrow().is_empty());
    }

    #[test]
    fn lock_speed_disables_adaptation() {
        let dict = Dictionary::load("international", &[]).unwrap();
        let message = load_text("paris paris", &dict).unwrap();
        let timings = get_timings(&message, &dict, Speed::new(20.0, 20.0)).unwrap();

        let mut d = MorseDecoder::new(dict, Speed::new(15.0, 15.0));
        d.set_lock_speed(true);
        for &t in &timings {
            d.add_timing(t);
        }
        d.flush();
        assert_eq!(d.speed().wpm(), 15.0);
    }

    #[test]
    fn message_callback_sees_every_increment() {
        let mut d = decoder();
        let seen: Rc<RefCell<String>> = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        d.on_message(move |event| sink.borrow_mut().push_str(&event.message));
        feed(
            &mut d,
            &[60.0, -60.0, 60.0, -180.0, 60.0, -420.0, 180.0],
        );
        assert_eq!(*seen.borrow(), d.message());
        assert_eq!(d.message(), "IE T");
    }
}
