//! Translation of DoH JSON answers (`application/dns-json`) into DNS wire
//! messages.
//!
//! ```text
//! {"Status":0,"TC":false,"RD":true,"RA":true,"AD":false,"CD":false,
//!  "Answer":[{"name":"example.com.","type":1,"TTL":300,"data":"93.184.216.34"}]}
//! ```
//!
//! Every record entry must decode. A single entry of an unsupported type or
//! with unparsable data fails the whole translation.

use dohproxy_domain::DomainError;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, NULL, PTR, SOA, SRV, TXT};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use hickory_proto::serialize::binary::BinEncodable;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use tracing::warn;

const TYPE_DNAME: u16 = 39;
const TYPE_OPT: u16 = 41;
const TYPE_CAA: u16 = 257;
const MAX_CHARACTER_STRING: usize = 255;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DohJsonResponse {
    #[serde(rename = "Status")]
    pub status: u16,
    #[serde(rename = "TC", default)]
    pub truncated: bool,
    #[serde(rename = "RD", default)]
    pub recursion_desired: bool,
    #[serde(rename = "RA", default)]
    pub recursion_available: bool,
    #[serde(rename = "AD", default)]
    pub authentic_data: bool,
    #[serde(rename = "CD", default)]
    pub checking_disabled: bool,
    #[serde(rename = "Answer", default)]
    pub answer: Vec<DohJsonRecord>,
    #[serde(rename = "Authority", default)]
    pub authority: Vec<DohJsonRecord>,
    #[serde(rename = "Additional", default)]
    pub additional: Vec<DohJsonRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DohJsonRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
    #[serde(rename = "TTL", default)]
    pub ttl: u32,
    #[serde(default)]
    pub data: String,
}

impl DohJsonResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(body)
            .map_err(|e| DomainError::InvalidUpstreamResponse(format!("invalid DoH JSON: {}", e)))
    }
}

pub struct JsonTranslator;

impl JsonTranslator {
    /// Builds the wire response for `query` out of the upstream JSON answer.
    /// The question section and any EDNS OPT of the query are echoed.
    pub fn to_wire(response: &DohJsonResponse, query: &Message) -> Result<Message, DomainError> {
        let rcode = wire_rcode(response.status, query);

        let mut message = Message::new();
        message
            .set_id(query.id())
            .set_message_type(MessageType::Response)
            .set_op_code(query.op_code())
            .set_response_code(rcode)
            .set_truncated(response.truncated)
            .set_recursion_desired(response.recursion_desired)
            .set_recursion_available(response.recursion_available)
            .set_authentic_data(response.authentic_data)
            .set_checking_disabled(response.checking_disabled);

        message.add_queries(query.queries().iter().cloned());
        if let Some(edns) = query.extensions() {
            message.set_edns(edns.clone());
        }

        for entry in &response.answer {
            message.add_answer(to_record(entry)?);
        }
        for entry in &response.authority {
            message.add_name_server(to_record(entry)?);
        }
        for entry in response.additional.iter().filter(|e| e.record_type != TYPE_OPT) {
            message.add_additional(to_record(entry)?);
        }

        Ok(message)
    }
}

/// Extended rcodes (16 and up) keep their upper bits in the OPT record. A
/// client that sent no OPT would see only the low 4 bits, which decode as a
/// different code, so those answers become SERVFAIL.
fn wire_rcode(status: u16, query: &Message) -> ResponseCode {
    let rcode: ResponseCode = status.into();
    if rcode.high() != 0 && query.extensions().is_none() {
        warn!(
            status,
            id = query.id(),
            "Extended upstream rcode needs EDNS, answering SERVFAIL"
        );
        return ResponseCode::ServFail;
    }
    rcode
}

fn to_record(entry: &DohJsonRecord) -> Result<Record, DomainError> {
    let name = parse_name(&entry.name)?;
    let rdata = to_rdata(entry.record_type, entry.data.trim())
        .map_err(|reason| translation_error(entry, &reason))?;
    Ok(Record::from_rdata(name, entry.ttl, rdata))
}

fn translation_error(entry: &DohJsonRecord, reason: &str) -> DomainError {
    DomainError::Translation(format!(
        "{} type {} data '{}': {}",
        entry.name, entry.record_type, entry.data, reason
    ))
}

fn to_rdata(record_type: u16, data: &str) -> Result<RData, String> {
    let rdata = match RecordType::from(record_type) {
        RecordType::A => RData::A(A(parse_ip::<Ipv4Addr>(data)?)),
        RecordType::AAAA => RData::AAAA(AAAA(parse_ip::<Ipv6Addr>(data)?)),
        RecordType::CNAME => RData::CNAME(CNAME(domain_name(data)?)),
        RecordType::NS => RData::NS(NS(domain_name(data)?)),
        RecordType::PTR => RData::PTR(PTR(domain_name(data)?)),
        RecordType::MX => {
            let [preference, exchange] = fields::<2>(data)?;
            RData::MX(MX::new(number(preference)?, domain_name(exchange)?))
        }
        RecordType::SRV => {
            let [priority, weight, port, target] = fields::<4>(data)?;
            RData::SRV(SRV::new(
                number(priority)?,
                number(weight)?,
                number(port)?,
                domain_name(target)?,
            ))
        }
        RecordType::SOA => {
            let [mname, rname, serial, refresh, retry, expire, minimum] = fields::<7>(data)?;
            RData::SOA(SOA::new(
                domain_name(mname)?,
                domain_name(rname)?,
                number(serial)?,
                number(refresh)?,
                number(retry)?,
                number(expire)?,
                number(minimum)?,
            ))
        }
        RecordType::TXT => RData::TXT(TXT::new(character_strings(data)?)),
        _ if record_type == TYPE_DNAME => {
            let target = domain_name(data)?;
            let wire = target.to_bytes().map_err(|e| e.to_string())?;
            opaque(TYPE_DNAME, wire)
        }
        _ if record_type == TYPE_CAA => opaque(TYPE_CAA, caa_wire(data)?),
        other => return Err(format!("unsupported record type {}", other)),
    };
    Ok(rdata)
}

fn opaque(code: u16, wire: Vec<u8>) -> RData {
    RData::Unknown {
        code: RecordType::from(code),
        rdata: NULL::with(wire),
    }
}

fn parse_name(raw: &str) -> Result<Name, DomainError> {
    domain_name(raw.trim()).map_err(|reason| {
        DomainError::Translation(format!("invalid owner name '{}': {}", raw, reason))
    })
}

fn domain_name(raw: &str) -> Result<Name, String> {
    let result = if raw.ends_with('.') {
        Name::from_ascii(raw)
    } else {
        Name::from_ascii(format!("{}.", raw))
    };
    result.map_err(|e| format!("invalid name '{}': {}", raw, e))
}

fn parse_ip<T: FromStr>(raw: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("invalid address '{}'", raw))
}

fn number<T: FromStr>(raw: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("invalid number '{}'", raw))
}

fn fields<const N: usize>(data: &str) -> Result<[&str; N], String> {
    let parts: Vec<&str> = data.split_whitespace().collect();
    <[&str; N]>::try_from(parts.as_slice())
        .map_err(|_| format!("expected {} fields, got {}", N, parts.len()))
}

/// Splits presentation-format TXT data into character strings. Quoted
/// segments are unescaped; unquoted data is taken as one string. Strings
/// longer than 255 bytes are split so each fits on the wire.
fn character_strings(data: &str) -> Result<Vec<String>, String> {
    let raw = if data.starts_with('"') {
        quoted_segments(data)?
    } else {
        vec![data.to_string()]
    };

    let mut out = Vec::with_capacity(raw.len());
    for segment in raw {
        split_to_wire_limit(segment, &mut out);
    }
    Ok(out)
}

fn quoted_segments(data: &str) -> Result<Vec<String>, String> {
    let mut segments = Vec::new();
    let mut chars = data.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some('"') => {}
            Some(c) => return Err(format!("unexpected '{}' outside quotes", c)),
        }

        let mut current = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err("dangling escape".to_string()),
                },
                '"' => {
                    closed = true;
                    break;
                }
                other => current.push(other),
            }
        }
        if !closed {
            return Err("unterminated quoted string".to_string());
        }
        segments.push(current);
    }

    Ok(segments)
}

fn split_to_wire_limit(segment: String, out: &mut Vec<String>) {
    if segment.len() <= MAX_CHARACTER_STRING {
        out.push(segment);
        return;
    }
    let mut current = String::new();
    for c in segment.chars() {
        if current.len() + c.len_utf8() > MAX_CHARACTER_STRING {
            out.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        out.push(current);
    }
}

/// `<flags> <tag> <value>` into CAA RDATA.
fn caa_wire(data: &str) -> Result<Vec<u8>, String> {
    let mut parts = data.splitn(3, char::is_whitespace);
    let flags: u8 = number(parts.next().unwrap_or_default())?;
    let tag = parts.next().unwrap_or_default();
    if tag.is_empty() || tag.len() > 15 || !tag.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(format!("invalid CAA tag '{}'", tag));
    }
    let value = parts.next().unwrap_or_default().trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    let mut wire = Vec::with_capacity(2 + tag.len() + value.len());
    wire.push(flags);
    wire.push(tag.len() as u8);
    wire.extend_from_slice(tag.as_bytes());
    wire.extend_from_slice(value.as_bytes());
    Ok(wire)
}
