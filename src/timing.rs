use serde::{Deserialize, Serialize};

use crate::dictionary::{Dictionary, RatioTable};
use crate::error::MorseError;
use crate::message::{Directive, Domain, Message, Node, Token};

// Reference word "PARIS ": 50 dit units total, of which 19 are
// inter-character and inter-word space (so 31 are sound and
// intra-character space).
const UNITS_PER_WORD: f64 = 50.0;
const SPACE_UNITS_PER_WORD: f64 = 19.0;
const MS_PER_MINUTE: f64 = 60_000.0;
const MIN_WPM: f64 = 1.0;

fn clamp_wpm(value: f64) -> f64 {
    if value.is_finite() {
        value.max(MIN_WPM)
    } else {
        MIN_WPM
    }
}

/// Character speed and Farnsworth speed, in words per minute.
///
/// Invariant: `1 <= fwpm <= wpm`. The setters keep it by clamping the
/// other side, so they can be called in any order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speed {
    wpm: f64,
    fwpm: f64,
}

impl Speed {
    pub fn new(wpm: f64, fwpm: f64) -> Speed {
        let wpm = clamp_wpm(wpm);
        Speed {
            wpm,
            fwpm: clamp_wpm(fwpm).min(wpm),
        }
    }

    pub fn wpm(&self) -> f64 {
        self.wpm
    }

    pub fn fwpm(&self) -> f64 {
        self.fwpm
    }

    /// Set the character speed; drags `fwpm` down if it would exceed it.
    pub fn with_wpm(self, wpm: f64) -> Speed {
        let wpm = clamp_wpm(wpm);
        Speed {
            wpm,
            fwpm: self.fwpm.min(wpm),
        }
    }

    /// Set the Farnsworth speed; drags `wpm` up if it would fall below.
    pub fn with_fwpm(self, fwpm: f64) -> Speed {
        let fwpm = clamp_wpm(fwpm);
        Speed {
            wpm: self.wpm.max(fwpm),
            fwpm,
        }
    }

    /// Base dit length in ms: one unit of the 50-unit reference word.
    pub fn dit_ms(&self) -> f64 {
        MS_PER_MINUTE / (UNITS_PER_WORD * self.wpm)
    }

    /// How much inter-character and inter-word spaces stretch relative
    /// to character timing. Derived from the reference word's unit
    /// counts: with U total units and S space units per word,
    /// `(U*wpm - (U-S)*fwpm) / (S*fwpm)`. Equals 1 when `fwpm == wpm`.
    pub fn farnsworth_ratio(&self) -> f64 {
        (UNITS_PER_WORD * self.wpm - (UNITS_PER_WORD - SPACE_UNITS_PER_WORD) * self.fwpm)
            / (SPACE_UNITS_PER_WORD * self.fwpm)
    }
}

impl Default for Speed {
    fn default() -> Self {
        Speed::new(20.0, 20.0)
    }
}

/// Signed element lengths in milliseconds (negative = silence): the
/// ratio table scaled by the base dit length, with the Farnsworth ratio
/// applied to the two between-character space types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementLengths {
    pub dit: f64,
    pub dah: f64,
    pub intra_space: f64,
    pub char_space: f64,
    pub word_space: f64,
}

impl ElementLengths {
    pub fn from_speed(ratio: &RatioTable, speed: Speed) -> ElementLengths {
        let base = speed.dit_ms();
        let stretch = speed.farnsworth_ratio();
        ElementLengths {
            dit: ratio.dit * base,
            dah: ratio.dah * base,
            intra_space: ratio.intra_space * base,
            char_space: ratio.char_space * base * stretch,
            word_space: ratio.word_space * base * stretch,
        }
    }
}

/// One playable element: a signed duration plus the volume/pitch
/// overrides active at that point (`None` = player default).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub duration_ms: f64,
    pub volume: Option<u32>,
    pub pitch: Option<u32>,
}

/// Per-call timing state. An explicit local frame, so directives can
/// never leak speed changes outside one `get_notes` invocation and the
/// walk is safe to re-enter.
struct Frame {
    speed: Speed,
    lengths: ElementLengths,
    pause_unit: f64,
    volume: Option<u32>,
    pitch: Option<u32>,
}

impl Frame {
    fn new(ratio: &RatioTable, speed: Speed) -> Frame {
        let lengths = ElementLengths::from_speed(ratio, speed);
        Frame {
            speed,
            lengths,
            pause_unit: lengths.word_space.abs(),
            volume: None,
            pitch: None,
        }
    }

    fn set_speed(&mut self, ratio: &RatioTable, speed: Speed) {
        self.speed = speed;
        self.lengths = ElementLengths::from_speed(ratio, speed);
        self.pause_unit = self.lengths.word_space.abs();
    }

    fn note(&self, duration_ms: f64) -> Note {
        Note {
            duration_ms,
            volume: self.volume,
            pitch: self.pitch,
        }
    }
}

/// Walk a (translated) tree and emit the ordered note sequence.
///
/// Pure function of `(message, dict, speed)`. Error-flagged trees in
/// either domain yield [`MorseError::Untranslatable`]; clean them
/// first. Morse messages time their raw element strings directly, text
/// messages must be fully translated.
pub fn get_notes(
    message: &Message,
    dict: &Dictionary,
    speed: Speed,
) -> Result<Vec<Note>, MorseError> {
    if message.has_error() {
        return Err(MorseError::Untranslatable);
    }
    let ratio = dict.ratio();
    let entry = speed;
    let mut frame = Frame::new(ratio, entry);
    let mut notes = Vec::new();

    for node in &message.nodes {
        match node {
            Node::Directive(d) => match d {
                Directive::VolumeReset => frame.volume = None,
                Directive::VolumeValue(v) => frame.volume = Some(*v),
                Directive::PitchReset => frame.pitch = None,
                Directive::PitchValue(v) => frame.pitch = Some(*v),
                Directive::TimingReset => frame.set_speed(ratio, entry),
                Directive::TimingEqual => {
                    let wpm = frame.speed.wpm();
                    frame.set_speed(ratio, frame.speed.with_fwpm(wpm));
                }
                Directive::TimingValue { wpm, fwpm } => {
                    let next = frame.speed.with_wpm(*wpm as f64).with_fwpm(*fwpm as f64);
                    frame.set_speed(ratio, next);
                }
                Directive::TimingList(values) => {
                    frame.lengths = ElementLengths {
                        dit: values[0] as f64,
                        dah: values[1] as f64,
                        intra_space: -(values[2] as f64),
                        char_space: -(values[3] as f64),
                        word_space: -(values[4] as f64),
                    };
                    frame.pause_unit = values.get(5).map_or(values[4] as f64, |v| *v as f64);
                }
                Directive::PauseSpace(count) => {
                    notes.push(frame.note(-(*count as f64 * frame.pause_unit)));
                }
                Directive::PauseValue(ms) => notes.push(frame.note(-(*ms as f64))),
            },
            Node::Words(words) => {
                let mut prev_sound = false;
                for i in 0..words.children.len() {
                    let token = match message.domain {
                        Domain::Morse => &words.children[i],
                        Domain::Text => match words.translation.get(i) {
                            Some(Some(t)) => t,
                            _ => return Err(MorseError::Untranslatable),
                        },
                    };
                    match token {
                        Token::WordSpace => {
                            notes.push(frame.note(frame.lengths.word_space));
                            prev_sound = false;
                        }
                        Token::CharSpace => {
                            notes.push(frame.note(frame.lengths.char_space));
                            prev_sound = false;
                        }
                        Token::Symbol(code) => {
                            if prev_sound {
                                notes.push(frame.note(frame.lengths.char_space));
                            }
                            for (j, mark) in code.chars().enumerate() {
                                if j > 0 {
                                    notes.push(frame.note(frame.lengths.intra_space));
                                }
                                match mark {
                                    '.' => notes.push(frame.note(frame.lengths.dit)),
                                    '-' => notes.push(frame.note(frame.lengths.dah)),
                                    _ => {}
                                }
                            }
                            prev_sound = true;
                        }
                    }
                }
            }
        }
    }
    Ok(notes)
}

/// [`get_notes`] reduced to the signed durations.
pub fn get_timings(
    message: &Message,
    dict: &Dictionary,
    speed: Speed,
) -> Result<Vec<f64>, MorseError> {
    Ok(get_notes(message, dict, speed)?
        .into_iter()
        .map(|n| n.duration_ms)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{load_morse, load_text};

    fn dict() -> Dictionary {
        Dictionary::load("international", &[]).unwrap()
    }

    fn floored(timings: &[f64]) -> Vec<i64> {
        timings.iter().map(|t| t.floor() as i64).collect()
    }

    #[test]
    fn morse_timing_at_20_wpm() {
        let m = load_morse(".. .- / --", &dict()).unwrap();
        let timings = get_timings(&m, &dict(), Speed::new(20.0, 20.0)).unwrap();
        assert_eq!(
            floored(&timings),
            vec![60, -60, 60, -180, 60, -60, 180, -420, 180, -60, 180]
        );
    }

    #[test]
    fn farnsworth_stretches_spaces_only() {
        let m = load_text("ee e", &dict()).unwrap();
        let timings = get_timings(&m, &dict(), Speed::new(20.0, 10.0)).unwrap();
        assert_eq!(floored(&timings), vec![60, -654, 60, -1526, 60]);
    }

    #[test]
    fn farnsworth_identity() {
        let speed = Speed::new(20.0, 20.0);
        assert!((speed.farnsworth_ratio() - 1.0).abs() < 1e-12);

        // At fwpm == wpm the output is plain ITU timing.
        let d = dict();
        let m = load_text("ab cd", &d).unwrap();
        let timings = get_timings(&m, &d, speed).unwrap();
        let lengths = ElementLengths::from_speed(d.ratio(), speed);
        for t in timings {
            let expected = [
                lengths.dit,
                lengths.dah,
                lengths.intra_space,
                lengths.char_space,
                lengths.word_space,
            ];
            assert!(expected.iter().any(|e| (t - e).abs() < 1e-9), "{t}");
        }
        assert_eq!(lengths.char_space, -180.0);
        assert_eq!(lengths.word_space, -420.0);
    }

    #[test]
    fn speed_invariant_holds_in_any_order() {
        let a = Speed::new(20.0, 20.0).with_wpm(10.0).with_fwpm(15.0);
        assert!(a.fwpm() <= a.wpm());
        assert_eq!(a.wpm(), 15.0);

        let b = Speed::new(20.0, 20.0).with_fwpm(15.0).with_wpm(10.0);
        assert!(b.fwpm() <= b.wpm());
        assert_eq!(b.fwpm(), 10.0);
    }

    #[test]
    fn malformed_speeds_clamp_to_one() {
        assert_eq!(Speed::new(-3.0, 0.0).wpm(), 1.0);
        assert_eq!(Speed::new(f64::NAN, f64::NAN).fwpm(), 1.0);
    }

    #[test]
    fn pause_directives() {
        let d = dict();
        let speed = Speed::new(20.0, 20.0);
        let m = load_text("e[99]e", &d).unwrap();
        assert_eq!(get_timings(&m, &d, speed).unwrap(), vec![60.0, -99.0, 60.0]);
        let m = load_text("e[99ms]e", &d).unwrap();
        assert_eq!(get_timings(&m, &d, speed).unwrap(), vec![60.0, -99.0, 60.0]);
    }

    #[test]
    fn pause_space_scales_the_word_space() {
        let d = dict();
        let m = load_text("e[   ]e", &d).unwrap();
        let timings = get_timings(&m, &d, Speed::new(20.0, 20.0)).unwrap();
        assert_eq!(timings, vec![60.0, -1260.0, 60.0]);
    }

    #[test]
    fn timing_value_and_reset_restore_entry_speed() {
        let d = dict();
        let m = load_text("[t40/40]e[t]e", &d).unwrap();
        let timings = get_timings(&m, &d, Speed::new(20.0, 20.0)).unwrap();
        assert_eq!(timings, vec![30.0, 60.0]);

        // The override never leaks into a later call.
        let m2 = load_text("e", &d).unwrap();
        assert_eq!(
            get_timings(&m2, &d, Speed::new(20.0, 20.0)).unwrap(),
            vec![60.0]
        );
    }

    #[test]
    fn timing_equal_collapses_the_farnsworth_gap() {
        let d = dict();
        let m = load_text("[t=]ee", &d).unwrap();
        let timings = get_timings(&m, &d, Speed::new(20.0, 10.0)).unwrap();
        assert_eq!(floored(&timings), vec![60, -180, 60]);
    }

    #[test]
    fn timing_list_overrides_element_lengths() {
        let d = dict();
        let m = load_text("[t10,30,10,30,70]ee e", &d).unwrap();
        let timings = get_timings(&m, &d, Speed::new(20.0, 20.0)).unwrap();
        assert_eq!(timings, vec![10.0, -30.0, 10.0, -70.0, 10.0]);
    }

    #[test]
    fn sixth_timing_value_sets_the_pause_unit() {
        let d = dict();
        let m = load_text("[t10,30,10,30,70,100]e[  ]e", &d).unwrap();
        let timings = get_timings(&m, &d, Speed::new(20.0, 20.0)).unwrap();
        assert_eq!(timings, vec![10.0, -200.0, 10.0]);
    }

    #[test]
    fn volume_and_pitch_annotate_notes() {
        let d = dict();
        let m = load_text("e[v100][p550]e[v]e", &d).unwrap();
        let notes = get_notes(&m, &d, Speed::default()).unwrap();
        assert_eq!(notes[0].volume, None);
        assert_eq!(notes[1].volume, Some(100));
        assert_eq!(notes[1].pitch, Some(550));
        assert_eq!(notes[2].volume, None);
        assert_eq!(notes[2].pitch, Some(550));
    }

    #[test]
    fn erroring_tree_is_rejected() {
        let d = dict();
        let m = load_text("ab#c", &d).unwrap();
        assert_eq!(
            get_timings(&m, &d, Speed::default()),
            Err(MorseError::Untranslatable)
        );
        // The cleaned tree times fine.
        assert!(get_timings(&m.clean(), &d, Speed::default()).is_ok());
    }

    #[test]
    fn erroring_morse_tree_is_rejected() {
        let d = dict();
        let m = load_morse("...... ..", &d).unwrap();
        assert!(m.has_error());
        assert_eq!(
            get_timings(&m, &d, Speed::default()),
            Err(MorseError::Untranslatable)
        );
        assert!(get_timings(&m.clean(), &d, Speed::default()).is_ok());
    }
}
