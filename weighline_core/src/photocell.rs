//! Photocell response parsing. The protocol has exactly two legal payloads,
//! so anything else is an error rather than a guess.

use crate::reading::PhotocellState;

/// Message recorded when the photocell answers with an illegal payload.
pub const INVALID_RESPONSE: &str = "Invalid response";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotocellReading {
    pub state: PhotocellState,
    pub is_error: bool,
}

pub fn parse_photocell(text: &str) -> PhotocellReading {
    match text.trim() {
        "1" => PhotocellReading {
            state: PhotocellState::Present,
            is_error: false,
        },
        "0" => PhotocellReading {
            state: PhotocellState::Absent,
            is_error: false,
        },
        _ => PhotocellReading {
            state: PhotocellState::Absent,
            is_error: true,
        },
    }
}
