//! Static lookup tables: characters to dot/dash strings, and spoken names to
//! the characters they stand for.

/// Symbol played for any input that cannot be resolved.
pub const FALLBACK_CHAR: char = '#';

/// International Morse code for a lowercase character.
///
/// `#` is not part of ITU Morse; it is given a distinctive eight-element code
/// so the fallback is audibly different from every real character.
pub fn symbol_for(c: char) -> Option<&'static str> {
    let code = match c {
        'a' => ".-",
        'b' => "-...",
        'c' => "-.-.",
        'd' => "-..",
        'e' => ".",
        'f' => "..-.",
        'g' => "--.",
        'h' => "....",
        'i' => "..",
        'j' => ".---",
        'k' => "-.-",
        'l' => ".-..",
        'm' => "--",
        'n' => "-.",
        'o' => "---",
        'p' => ".--.",
        'q' => "--.-",
        'r' => ".-.",
        's' => "...",
        't' => "-",
        'u' => "..-",
        'v' => "...-",
        'w' => ".--",
        'x' => "-..-",
        'y' => "-.--",
        'z' => "--..",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        '0' => "-----",
        '.' => ".-.-.-",
        ',' => "--..--",
        '?' => "..--..",
        '\'' => ".----.",
        '!' => "-.-.--",
        '/' => "-..-.",
        '(' => "-.--.",
        ')' => "-.--.-",
        '&' => ".-...",
        ':' => "---...",
        ';' => "-.-.-.",
        '=' => "-...-",
        '+' => ".-.-.",
        '-' => "-....-",
        '_' => "..--.-",
        '"' => ".-..-.",
        '$' => "...-..-",
        '@' => ".--.-.",
        FALLBACK_CHAR => "....-.-.",
        _ => return None,
    };
    Some(code)
}

/// Spoken digit names ("one" → '1'). "niner" is the radiotelephony form of nine.
pub fn digit_for_word(word: &str) -> Option<char> {
    let digit = match word {
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" | "niner" => '9',
        _ => return None,
    };
    Some(digit)
}

/// Spoken punctuation names ("period" → '.').
///
/// A few names resolve to characters with no Morse code (`\`, `]`); those
/// encode to silence followed by the word gap.
pub fn special_for_word(word: &str) -> Option<char> {
    let special = match word {
        "period" | "dot" => '.',
        "comma" => ',',
        "question" | "question mark" => '?',
        "exclamation" | "exclamation mark" => '!',
        "slash" => '/',
        "backslash" => '\\',
        "at sign" => '@',
        "colon" => ':',
        "semicolon" => ';',
        "equals" => '=',
        "plus" => '+',
        "minus" | "dash" | "hyphen" => '-',
        "underscore" => '_',
        "quote" => '"',
        "apostrophe" => '\'',
        "dollar" => '$',
        "paren" => ')',
        "bracket" => ']',
        _ => return None,
    };
    Some(special)
}
