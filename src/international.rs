// International (ITU) Morse data tables consumed by the dictionary layer.
// Element strings use '.' and '-' only; spacing is structural and carried
// by the ratio table.

/// Relative element durations, normalized so that a dit is 1.
/// Negative values are silence.
pub(crate) const RATIO_DIT: f64 = 1.0;
pub(crate) const RATIO_DAH: f64 = 3.0;
pub(crate) const RATIO_INTRA_SPACE: f64 = -1.0;
pub(crate) const RATIO_CHAR_SPACE: f64 = -3.0;
pub(crate) const RATIO_WORD_SPACE: f64 = -7.0;

/// Base letter/figure/punctuation table.
pub(crate) const LETTERS: &[(&str, &str)] = &[
    ("A", ".-"),
    ("B", "-..."),
    ("C", "-.-."),
    ("D", "-.."),
    ("E", "."),
    ("F", "..-."),
    ("G", "--."),
    ("H", "...."),
    ("I", ".."),
    ("J", ".---"),
    ("K", "-.-"),
    ("L", ".-.."),
    ("M", "--"),
    ("N", "-."),
    ("O", "---"),
    ("P", ".--."),
    ("Q", "--.-"),
    ("R", ".-."),
    ("S", "..."),
    ("T", "-"),
    ("U", "..-"),
    ("V", "...-"),
    ("W", ".--"),
    ("X", "-..-"),
    ("Y", "-.--"),
    ("Z", "--.."),
    ("1", ".----"),
    ("2", "..---"),
    ("3", "...--"),
    ("4", "....-"),
    ("5", "....."),
    ("6", "-...."),
    ("7", "--..."),
    ("8", "---.."),
    ("9", "----."),
    ("0", "-----"),
    (".", ".-.-.-"),
    (",", "--..--"),
    ("?", "..--.."),
    ("'", ".----."),
    ("!", "-.-.--"),
    ("(", "-.--."),
    (")", "-.--.-"),
    ("&", ".-..."),
    (":", "---..."),
    (";", "-.-.-."),
    ("=", "-...-"),
    ("+", ".-.-."),
    ("-", "-....-"),
    ("_", "..--.-"),
    ("\"", ".-..-."),
    ("/", "-..-."),
    ("$", "...-..-"),
    ("@", ".--.-."),
];

/// Procedural signals, written in text as bracketed multi-letter tokens
/// and keyed as a single fused element string.
pub(crate) const PROSIGNS: &[(&str, &str)] = &[
    ("<AA>", ".-.-"),
    ("<AR>", ".-.-."),
    ("<AS>", ".-..."),
    ("<BK>", "-...-.-"),
    ("<BT>", "-...-"),
    ("<CL>", "-.-..-.."),
    ("<CT>", "-.-.-"),
    ("<HH>", "........"),
    ("<KN>", "-.--."),
    ("<NJ>", "-..---"),
    ("<SK>", "...-.-"),
    ("<SN>", "...-."),
    ("<SOS>", "...---..."),
];

/// Accented-letter overlay.
pub(crate) const ACCENTS: &[(&str, &str)] = &[
    ("À", ".--.-"),
    ("Å", ".--.-"),
    ("Ä", ".-.-"),
    ("È", ".-..-"),
    ("É", "..-.."),
    ("Ö", "---."),
    ("Ü", "..--"),
    ("Ç", "-.-.."),
    ("Ñ", "--.--"),
];

