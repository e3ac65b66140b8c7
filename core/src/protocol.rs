//! Splits harness stdout into user output and the result payload.

use polyrun_webclient::Value;

use crate::harness::Marker;

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The marker line never appeared.
    Absent,
    Value(Value),
    /// Text after the marker that is not valid JSON.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub user_stdout: String,
    pub payload: Payload,
}

impl Payload {
    pub fn into_output(self) -> Option<Value> {
        match self {
            Payload::Absent => None,
            Payload::Value(v) => Some(v),
            Payload::Raw(s) => Some(Value::String(s)),
        }
    }
}

/// Splits at the first line equal to `marker`.
///
/// The harness writes a newline before the marker, so one trailing `\n` is
/// removed from the user output.
pub fn parse(stdout: &str, marker: &Marker) -> Parsed {
    let marker = marker.as_str();

    let mut offset = 0;
    for line in stdout.split_inclusive('\n') {
        let bare = line.strip_suffix('\n').unwrap_or(line);
        let bare = bare.strip_suffix('\r').unwrap_or(bare);
        if bare == marker {
            let before = &stdout[..offset];
            let before = before
                .strip_suffix("\r\n")
                .or_else(|| before.strip_suffix('\n'))
                .unwrap_or(before);
            let after = stdout[offset + line.len()..].trim();
            return Parsed {
                user_stdout: before.to_owned(),
                payload: decode(after),
            };
        }
        offset += line.len();
    }

    Parsed {
        user_stdout: stdout.to_owned(),
        payload: Payload::Absent,
    }
}

fn decode(text: &str) -> Payload {
    match serde_json::from_str::<Value>(text) {
        Ok(v) => Payload::Value(v),
        Err(e) => {
            log::warn!("Result payload is not valid JSON ({}): {:?}", e, text);
            Payload::Raw(text.to_owned())
        }
    }
}
