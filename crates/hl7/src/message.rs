//! Segments, fields and components.
//!
//! Field numbering follows the HL7 standard for every segment, `MSH` included: for
//! `MSH|^~\&|SENDER|...`, field 1 is the field separator `|`, field 2 the encoding
//! characters, and field 3 `SENDER`. Field 0 is the segment name.

use crate::{Hl7Error, Hl7Result};
use std::fmt;
use std::str::FromStr;

/// Separators declared in `MSH-1` and `MSH-2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    fields: Vec<String>,
    delimiters: Delimiters,
}

impl Segment {
    /// Build a segment from its name and fields 1..n (HL7 numbering).
    ///
    /// For `MSH`, `fields[0]` must be the field separator and `fields[1]` the encoding
    /// characters, as in the parsed representation.
    pub fn new(name: &str, fields: Vec<String>, delimiters: Delimiters) -> Self {
        let mut all = Vec::with_capacity(fields.len() + 1);
        all.push(name.to_string());
        all.extend(fields);
        Self {
            fields: all,
            delimiters,
        }
    }

    pub fn name(&self) -> &str {
        &self.fields[0]
    }

    /// Raw value of field `n`; empty when absent.
    pub fn field(&self, n: usize) -> &str {
        self.fields.get(n).map(String::as_str).unwrap_or("")
    }

    /// Component `c` (1-based) of field `n`; empty when absent.
    pub fn component(&self, n: usize, c: usize) -> &str {
        if c == 0 {
            return "";
        }
        self.field(n)
            .split(self.delimiters.component)
            .nth(c - 1)
            .unwrap_or("")
    }

    /// Number of fields, the segment name included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.len() <= 1
    }

    fn is_header(&self) -> bool {
        self.name() == "MSH"
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = self.delimiters.field;
        // MSH-1 is the separator itself and is not repeated.
        let first_value = if self.is_header() {
            write!(f, "{}{sep}{}", self.name(), self.field(2))?;
            3
        } else {
            write!(f, "{}", self.name())?;
            1
        };
        for value in self.fields.iter().skip(first_value) {
            write!(f, "{sep}{value}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    segments: Vec<Segment>,
}

impl Message {
    /// The first segment must be `MSH`.
    pub fn new(segments: Vec<Segment>) -> Hl7Result<Self> {
        match segments.first() {
            Some(first) if first.is_header() => Ok(Self { segments }),
            _ => Err(Hl7Error::MissingMsh),
        }
    }

    pub fn header(&self) -> &Segment {
        &self.segments[0]
    }

    pub fn all_segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Every segment with the given name, in message order.
    pub fn segments<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Segment> + 'a {
        self.segments.iter().filter(move |s| s.name() == name)
    }

    /// First segment with the given name.
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name() == name)
    }

    /// Message type from `MSH-9`, e.g. `ADT^A04`.
    pub fn message_type(&self) -> &str {
        self.header().field(9)
    }

    /// Message control id from `MSH-10`.
    pub fn control_id(&self) -> &str {
        self.header().field(10)
    }

    pub fn delimiters(&self) -> Delimiters {
        self.header().delimiters
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "\r")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Message {
    type Err = Hl7Error;

    fn from_str(text: &str) -> Hl7Result<Self> {
        let normalised = text.replace("\r\n", "\r").replace('\n', "\r");
        let mut lines = normalised.split('\r').filter(|l| !l.trim().is_empty());

        let header = lines.next().ok_or(Hl7Error::MissingMsh)?;
        if !header.starts_with("MSH") {
            return Err(Hl7Error::MissingMsh);
        }
        let delimiters = parse_delimiters(header)?;

        let mut segments = vec![parse_header(header, delimiters)];
        for line in lines {
            let fields = line
                .split(delimiters.field)
                .map(str::to_owned)
                .collect::<Vec<_>>();
            segments.push(Segment { fields, delimiters });
        }
        Message::new(segments)
    }
}

/// Parse an HL7v2 message from raw bytes (UTF-8).
///
/// `\r\n` and `\n` line endings are accepted in place of `\r`.
pub fn parse_message(data: &[u8]) -> Hl7Result<Message> {
    std::str::from_utf8(data)?.parse()
}

fn parse_delimiters(header: &str) -> Hl7Result<Delimiters> {
    let mut chars = header.chars().skip(3);
    let field = chars
        .next()
        .ok_or_else(|| Hl7Error::MalformedHeader("missing field separator".into()))?;
    let component = chars
        .next()
        .filter(|c| *c != field)
        .ok_or_else(|| Hl7Error::MalformedHeader("missing encoding characters".into()))?;
    Ok(Delimiters { field, component })
}

fn parse_header(header: &str, delimiters: Delimiters) -> Segment {
    // "MSH|^~\&|A" splits into ["MSH", "^~\&", "A"]; MSH-1 is re-inserted.
    let mut parts = header.split(delimiters.field).map(str::to_owned);
    let mut fields = Vec::new();
    fields.extend(parts.next());
    fields.push(delimiters.field.to_string());
    fields.extend(parts);
    Segment { fields, delimiters }
}
