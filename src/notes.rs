//! Solfège note names and their mapping onto MIDI note numbers.

/// Display sentinel shown while no device is delivering notes.
pub const NO_INPUT: &str = "No Input";

/// The seven syllables the glove can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solfa {
    Do,
    Re,
    Mi,
    Fa,
    So,
    La,
    Ti,
}

impl Solfa {
    pub const ALL: [Solfa; 7] = [
        Solfa::Do,
        Solfa::Re,
        Solfa::Mi,
        Solfa::Fa,
        Solfa::So,
        Solfa::La,
        Solfa::Ti,
    ];

    /// Parses a syllable exactly as the glove sends it (lowercase, case-sensitive).
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            "do" => Some(Solfa::Do),
            "re" => Some(Solfa::Re),
            "mi" => Some(Solfa::Mi),
            "fa" => Some(Solfa::Fa),
            "so" => Some(Solfa::So),
            "la" => Some(Solfa::La),
            "ti" => Some(Solfa::Ti),
            _ => None,
        }
    }

    /// Semitones above the root in a major scale.
    pub fn offset(self) -> u8 {
        match self {
            Solfa::Do => 0,
            Solfa::Re => 2,
            Solfa::Mi => 4,
            Solfa::Fa => 5,
            Solfa::So => 7,
            Solfa::La => 9,
            Solfa::Ti => 11,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Solfa::Do => "do",
            Solfa::Re => "re",
            Solfa::Mi => "mi",
            Solfa::Fa => "fa",
            Solfa::So => "so",
            Solfa::La => "la",
            Solfa::Ti => "ti",
        }
    }
}

/// Maps a received symbol onto a MIDI note number relative to `root`.
///
/// Unknown symbols (partial reads, the [`NO_INPUT`] sentinel) yield `None`,
/// as does any result above the MIDI range.
pub fn map_note(symbol: &str, root: u8) -> Option<u8> {
    let note = root.checked_add(Solfa::parse(symbol)?.offset())?;
    (note <= 127).then_some(note)
}
