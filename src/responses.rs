use alloc::string::String;
use alloc::vec::Vec;
use atat::atat_derive::AtatResp;

/// Commands which gets just responded by OK
#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Header of passive mode receive responses
const RECEIVE_HEADER: &[u8] = b"+CIPRECVDATA";

/// Prefix of access point scan result lines
const SCAN_PREFIX: &str = "+CWLAP:";

/// Single access point found by scan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessPoint {
    pub ssid: String,
    pub mac: String,

    /// Signal strength in dBm
    pub rssi: i32,
}

impl AccessPoint {
    /// Parses a single scan result line, e.g. `+CWLAP:(3,"garden",-61,"ca:d7:19:d8:a6:44",6)`.
    /// Returns None for any other or malformed line.
    pub(crate) fn from_line(line: &str) -> Option<Self> {
        let list = line.strip_prefix(SCAN_PREFIX)?;
        let list = list.strip_prefix('(').unwrap_or(list);
        let list = list.strip_suffix(')').unwrap_or(list);

        let fields = split_fields(list);
        if fields.len() < 4 {
            return None;
        }

        Some(Self {
            ssid: String::from(unquote(fields[1])),
            rssi: fields[2].trim().parse().ok()?,
            mac: String::from(unquote(fields[3])),
        })
    }
}

/// Collects all access points of a scan response body. Malformed lines are skipped.
pub(crate) fn parse_access_points<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<AccessPoint> {
    lines
        .filter(|line| line.starts_with(SCAN_PREFIX))
        .filter_map(|line| {
            let access_point = AccessPoint::from_line(line);
            if access_point.is_none() {
                log::warn!("Skipping malformed scan line: {}", line);
            }
            access_point
        })
        .collect()
}

/// Splits comma separated fields. Commas inside double quotes do not separate fields.
pub(crate) fn split_fields(list: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut quoted = false;
    let mut start = 0;

    for (index, byte) in list.bytes().enumerate() {
        match byte {
            b'"' => quoted = !quoted,
            b',' if !quoted => {
                fields.push(&list[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    fields.push(&list[start..]);
    fields
}

/// Strips surrounding double quotes
fn unquote(field: &str) -> &str {
    let field = field.trim();
    let field = field.strip_prefix('"').unwrap_or(field);
    field.strip_suffix('"').unwrap_or(field)
}

/// Reasons for not returning data of a receive response
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiveParseError {
    /// Less bytes present than declared. Data is expected to be complete on the next poll.
    ShortRead { declared: usize, available: usize },

    /// Header missing or length not parsable
    Malformed,
}

/// Extracts the payload of a receive response body.
///
/// ESP-AT firmware answers with `+CIPRECVDATA,<len>:<data>`, while the AT instruction set manual
/// documents `+CIPRECVDATA:<len>,<data>`. The actual wire order is parsed here.
pub(crate) fn parse_received_data(body: &[u8]) -> Result<&[u8], ReceiveParseError> {
    let header = find(body, RECEIVE_HEADER).ok_or(ReceiveParseError::Malformed)?;
    let response = &body[header + RECEIVE_HEADER.len()..];

    let comma = response.iter().position(|b| *b == b',').ok_or(ReceiveParseError::Malformed)?;
    let colon = response.iter().position(|b| *b == b':').ok_or(ReceiveParseError::Malformed)?;
    if colon < comma {
        return Err(ReceiveParseError::Malformed);
    }

    let length = core::str::from_utf8(&response[comma + 1..colon])
        .ok()
        .and_then(|length| length.trim().parse::<usize>().ok())
        .ok_or(ReceiveParseError::Malformed)?;

    let data = &response[colon + 1..];
    if data.len() < length {
        return Err(ReceiveParseError::ShortRead {
            declared: length,
            available: data.len(),
        });
    }

    Ok(&data[..length])
}

/// Returns the index of the first occurrence of needle
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }

    haystack.windows(needle.len()).position(|window| window == needle)
}
