/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Parser for instruction traces.
//!
//! Every non empty line has the form `<pid> <operation> [<hex value>]`,
//! lines starting with `#` are comments.

use std::fmt;

use paging_sim::{Pid, Segment, VirtualAddress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraceOp {
    Switch,
    Alloc(u64),
    Free(VirtualAddress),
    Access(Segment, VirtualAddress),
}

impl TraceOp {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            TraceOp::Switch => "switch",
            TraceOp::Alloc(_) => "alloc",
            TraceOp::Free(_) => "free",
            TraceOp::Access(Segment::Code, _) => "access_code",
            TraceOp::Access(Segment::Stack, _) => "access_stack",
            TraceOp::Access(Segment::Heap, _) => "access_heap",
        }
    }

    pub(crate) fn value(&self) -> u64 {
        match self {
            TraceOp::Switch => 0,
            TraceOp::Alloc(size) => *size,
            TraceOp::Free(address) | TraceOp::Access(_, address) => *address as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TraceLine {
    pub(crate) pid: Pid,
    pub(crate) op: TraceOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParseError {
    MissingField(&'static str),
    InvalidPid(String),
    InvalidNumber(String),
    UnknownOperation(String),
    TrailingInput(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingField(field) => write!(f, "missing {}", field),
            ParseError::InvalidPid(pid) => write!(f, "invalid pid {:?}", pid),
            ParseError::InvalidNumber(value) => write!(f, "invalid hex value {:?}", value),
            ParseError::UnknownOperation(op) => write!(f, "unknown operation {:?}", op),
            ParseError::TrailingInput(rest) => write!(f, "unexpected input {:?}", rest),
        }
    }
}

fn parse_hex(value: &str) -> Result<u64, ParseError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    u64::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidNumber(value.to_string()))
}

fn parse_address(value: &str) -> Result<VirtualAddress, ParseError> {
    let address = parse_hex(value)?;
    VirtualAddress::try_from(address).map_err(|_| ParseError::InvalidNumber(value.to_string()))
}

/// Parses one trace line, returns `None` for blank lines and comments
pub(crate) fn parse_line(line: &str) -> Result<Option<TraceLine>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();

    let pid = fields.next().ok_or(ParseError::MissingField("pid"))?;
    let pid: Pid = pid
        .parse()
        .map_err(|_| ParseError::InvalidPid(pid.to_string()))?;

    let op = fields.next().ok_or(ParseError::MissingField("operation"))?;
    let mut value = || fields.next().ok_or(ParseError::MissingField("value"));

    let op = match op {
        "switch" => TraceOp::Switch,
        "alloc" => TraceOp::Alloc(parse_hex(value()?)?),
        "free" => TraceOp::Free(parse_address(value()?)?),
        "access_code" => TraceOp::Access(Segment::Code, parse_address(value()?)?),
        // older traces spell it without the c
        "access_stack" | "access_stak" => {
            TraceOp::Access(Segment::Stack, parse_address(value()?)?)
        }
        "access_heap" => TraceOp::Access(Segment::Heap, parse_address(value()?)?),
        other => return Err(ParseError::UnknownOperation(other.to_string())),
    };

    let rest: Vec<&str> = fields.collect();
    if !rest.is_empty() {
        return Err(ParseError::TrailingInput(rest.join(" ")));
    }

    Ok(Some(TraceLine { pid, op }))
}

#[cfg(test)]
mod test {
    use paging_sim::Segment;

    use super::{parse_line, ParseError, TraceLine, TraceOp};

    #[test]
    fn test_parse_operations() {
        let cases = [
            ("1 switch", 1, TraceOp::Switch),
            ("2 alloc 0x4000", 2, TraceOp::Alloc(0x4000)),
            ("2 alloc 1f", 2, TraceOp::Alloc(0x1f)),
            ("3 free 0x00400000", 3, TraceOp::Free(0x40_0000)),
            ("4 access_code 0x10", 4, TraceOp::Access(Segment::Code, 0x10)),
            ("4 access_stack FFFFFFFF", 4, TraceOp::Access(Segment::Stack, u32::MAX)),
            ("4 access_stak 0xfffff000", 4, TraceOp::Access(Segment::Stack, 0xFFFF_F000)),
            ("  5   access_heap   0X2000  ", 5, TraceOp::Access(Segment::Heap, 0x2000)),
        ];

        for (line, pid, op) in cases {
            assert_eq!(parse_line(line), Ok(Some(TraceLine { pid, op })), "{}", line);
        }
    }

    #[test]
    fn test_skip_blank_and_comments() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("# 1 alloc 0x1000"), Ok(None));
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(parse_line("x switch"), Err(ParseError::InvalidPid("x".into())));
        assert_eq!(parse_line("1"), Err(ParseError::MissingField("operation")));
        assert_eq!(parse_line("1 alloc"), Err(ParseError::MissingField("value")));
        assert_eq!(
            parse_line("1 alloc 0xZZ"),
            Err(ParseError::InvalidNumber("0xZZ".into()))
        );
        assert_eq!(
            parse_line("1 free 0x100000000"),
            Err(ParseError::InvalidNumber("0x100000000".into()))
        );
        assert_eq!(
            parse_line("1 jump 0x10"),
            Err(ParseError::UnknownOperation("jump".into()))
        );
        assert_eq!(
            parse_line("1 switch 0x10"),
            Err(ParseError::TrailingInput("0x10".into()))
        );
    }

    #[test]
    fn test_op_names() {
        assert_eq!(TraceOp::Access(Segment::Stack, 0).name(), "access_stack");
        assert_eq!(TraceOp::Alloc(0x20).value(), 0x20);
        assert_eq!(TraceOp::Switch.value(), 0);
    }
}
