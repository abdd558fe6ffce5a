//
//  read.rs
//  ifcprune
//

use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;
use tracing::debug;

use crate::error::{PruneError, Result};
use crate::model::{AttrValue, Entity, EntityId, GraphModel};

/// Load a STEP file from disk.
pub fn load(path: &Path) -> Result<GraphModel> {
    if !path.exists() {
        return Err(PruneError::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Parse STEP physical file text into a graph.
///
/// Header records are preserved verbatim for re-serialization. Data records
/// have the form `#id=TYPE(args);` and may span lines; `/* */` comments are
/// skipped anywhere outside strings.
pub fn parse(text: &str) -> Result<GraphModel> {
    let mut scanner = RecordScanner::new(text);
    let mut graph = GraphModel::new();
    let mut in_header = false;
    let mut saw_iso = false;

    while let Some(record) = scanner.next_record()? {
        let trimmed = record.text.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('#') {
            parse_entity(trimmed, record.line, &mut graph)?;
            continue;
        }

        let keyword = trimmed
            .split('(')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_uppercase();
        match keyword.as_str() {
            "ISO-10303-21" => saw_iso = true,
            "HEADER" => in_header = true,
            "ENDSEC" => in_header = false,
            "DATA" => {}
            "END-ISO-10303-21" => break,
            _ if in_header => graph.push_header_record(trimmed.to_string()),
            other => {
                return Err(PruneError::parse(
                    record.line,
                    format!("unexpected record '{other}'"),
                ));
            }
        }
    }

    if !saw_iso {
        return Err(PruneError::InvalidFile(
            "missing ISO-10303-21 marker".to_string(),
        ));
    }

    debug!(entities = graph.len(), "model parsed");
    Ok(graph)
}

struct Record {
    text: String,
    line: usize,
}

/// Splits the input into `;`-terminated records, honoring strings and
/// skipping comments.
struct RecordScanner<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> RecordScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    if ahead.peek() == Some(&'*') {
                        self.bump();
                        self.bump();
                        loop {
                            match self.bump() {
                                Some('*') if self.chars.peek() == Some(&'/') => {
                                    self.bump();
                                    break;
                                }
                                Some(_) => {}
                                None => return,
                            }
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        self.skip_trivia();
        if self.chars.peek().is_none() {
            return Ok(None);
        }

        let start_line = self.line;
        let mut text = String::new();
        loop {
            self.skip_trivia();
            match self.bump() {
                Some(';') => {
                    return Ok(Some(Record {
                        text,
                        line: start_line,
                    }));
                }
                Some('\'') => {
                    text.push('\'');
                    // Quotes are escaped by doubling inside strings.
                    loop {
                        match self.bump() {
                            Some('\'') => {
                                text.push('\'');
                                if self.chars.peek() == Some(&'\'') {
                                    self.bump();
                                    text.push('\'');
                                } else {
                                    break;
                                }
                            }
                            Some(c) => text.push(c),
                            None => {
                                return Err(PruneError::parse(
                                    start_line,
                                    "unterminated string",
                                ));
                            }
                        }
                    }
                }
                Some(c) => text.push(c),
                None => {
                    return Err(PruneError::parse(start_line, "unterminated record"));
                }
            }
        }
    }
}

fn parse_entity(text: &str, line: usize, graph: &mut GraphModel) -> Result<()> {
    let body = &text[1..];
    let eq = body
        .find('=')
        .ok_or_else(|| PruneError::parse(line, "expected '=' in entity record"))?;
    let id: u64 = body[..eq]
        .trim()
        .parse()
        .map_err(|_| PruneError::parse(line, "invalid entity id"))?;
    let id = EntityId(id);
    if graph.contains(id) {
        return Err(PruneError::parse(line, format!("duplicate entity {id}")));
    }

    let rhs = body[eq + 1..].trim();
    let paren = rhs
        .find('(')
        .ok_or_else(|| PruneError::parse(line, "expected attribute list"))?;
    let ty = rhs[..paren].trim();
    if ty.is_empty() || !ty.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PruneError::parse(line, format!("invalid type name '{ty}'")));
    }

    let mut cursor = Cursor {
        chars: rhs[paren + 1..].chars().peekable(),
        line,
    };
    let attrs = cursor.parse_values_until_close()?;
    cursor.skip_ws();
    if cursor.chars.next().is_some() {
        return Err(PruneError::parse(line, "trailing characters after record"));
    }

    graph.insert(Entity::new(id, ty, attrs));
    Ok(())
}

struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn err(&self, message: impl Into<String>) -> PruneError {
        PruneError::parse(self.line, message)
    }

    /// Parse comma-separated values up to and including the closing `)`.
    fn parse_values_until_close(&mut self) -> Result<Vec<AttrValue>> {
        let mut values = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek() {
                Some(')') => {
                    self.chars.next();
                    return Ok(values);
                }
                Some(_) => {
                    values.push(self.parse_value()?);
                    self.skip_ws();
                    match self.chars.peek() {
                        Some(',') => {
                            self.chars.next();
                        }
                        Some(')') => {}
                        _ => return Err(self.err("expected ',' or ')'")),
                    }
                }
                None => return Err(self.err("unterminated attribute list")),
            }
        }
    }

    fn parse_value(&mut self) -> Result<AttrValue> {
        self.skip_ws();
        match self.chars.peek() {
            Some('$') => {
                self.chars.next();
                Ok(AttrValue::Null)
            }
            Some('*') => {
                self.chars.next();
                Ok(AttrValue::Derived)
            }
            Some('#') => {
                self.chars.next();
                let mut digits = String::new();
                while self.chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    digits.push(self.chars.next().unwrap());
                }
                let id: u64 = digits
                    .parse()
                    .map_err(|_| self.err("invalid reference"))?;
                Ok(AttrValue::Ref(EntityId(id)))
            }
            Some('(') => {
                self.chars.next();
                Ok(AttrValue::List(self.parse_values_until_close()?))
            }
            Some('\'') => self.parse_string(),
            Some('.') => self.parse_enum(),
            Some(c) if c.is_ascii_alphabetic() || *c == '_' => self.parse_ident_or_typed(),
            Some(c) if c.is_ascii_digit() || *c == '-' || *c == '+' => self.parse_number(),
            Some(&c) => Err(self.err(format!("unexpected character '{c}'"))),
            None => Err(self.err("unexpected end of attribute list")),
        }
    }

    /// Raw string including its quotes; doubled quotes stay doubled.
    fn parse_string(&mut self) -> Result<AttrValue> {
        let mut raw = String::new();
        raw.push(self.chars.next().unwrap());
        loop {
            match self.chars.next() {
                Some('\'') => {
                    raw.push('\'');
                    if self.chars.peek() == Some(&'\'') {
                        raw.push(self.chars.next().unwrap());
                    } else {
                        return Ok(AttrValue::Raw(raw));
                    }
                }
                Some(c) => raw.push(c),
                None => return Err(self.err("unterminated string")),
            }
        }
    }

    /// Enumeration literal such as `.ELEMENT.` or `.T.`.
    fn parse_enum(&mut self) -> Result<AttrValue> {
        let mut raw = String::new();
        raw.push(self.chars.next().unwrap());
        loop {
            match self.chars.next() {
                Some('.') => {
                    raw.push('.');
                    return Ok(AttrValue::Raw(raw));
                }
                Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '-' => raw.push(c),
                Some(c) => return Err(self.err(format!("invalid enum character '{c}'"))),
                None => return Err(self.err("unterminated enum literal")),
            }
        }
    }

    /// Bare identifier, or a typed parameter like `IFCBOOLEAN(.T.)`, kept
    /// verbatim as raw text with its parentheses balanced.
    fn parse_ident_or_typed(&mut self) -> Result<AttrValue> {
        let mut raw = String::new();
        while self
            .chars
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            raw.push(self.chars.next().unwrap());
        }
        if self.chars.peek() != Some(&'(') {
            return Ok(AttrValue::Raw(raw));
        }

        raw.push(self.chars.next().unwrap());
        let mut depth = 1usize;
        while depth > 0 {
            match self.chars.next() {
                Some('(') => {
                    depth += 1;
                    raw.push('(');
                }
                Some(')') => {
                    depth -= 1;
                    raw.push(')');
                }
                Some('\'') => {
                    raw.push('\'');
                    loop {
                        match self.chars.next() {
                            Some('\'') => {
                                raw.push('\'');
                                if self.chars.peek() == Some(&'\'') {
                                    raw.push(self.chars.next().unwrap());
                                } else {
                                    break;
                                }
                            }
                            Some(c) => raw.push(c),
                            None => return Err(self.err("unterminated string")),
                        }
                    }
                }
                Some(c) => raw.push(c),
                None => return Err(self.err("unbalanced typed parameter")),
            }
        }
        Ok(AttrValue::Raw(raw))
    }

    fn parse_number(&mut self) -> Result<AttrValue> {
        let mut raw = String::new();
        while self.chars.peek().is_some_and(|c| {
            c.is_ascii_digit() || matches!(*c, '.' | 'e' | 'E' | '-' | '+')
        }) {
            raw.push(self.chars.next().unwrap());
        }
        Ok(AttrValue::Raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "ISO-10303-21;
HEADER;
FILE_DESCRIPTION((''),'2;1');
FILE_NAME('','',(''),(''),'','','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('2O2Fr$t4X7Zf8NOew3FLOH',$,'Default',$,$,$,$,(#5),$);
#2=IFCWALL('0DWgwt6o1FOx7466fPk$jl',$,'Wall',$,$,$,$,$,$);
#5=IFCUNITASSIGNMENT((#6));
#6=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn test_parse_sample() {
        let graph = parse(SAMPLE).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.header().len(), 3);

        let project = graph.get(EntityId(1)).unwrap();
        assert_eq!(project.ty, "IFCPROJECT");
        assert_eq!(
            project.attr(7),
            Some(&AttrValue::List(vec![AttrValue::Ref(EntityId(5))]))
        );

        let unit = graph.get(EntityId(6)).unwrap();
        assert_eq!(unit.attr(0), Some(&AttrValue::Derived));
        assert_eq!(unit.attr(1), Some(&AttrValue::Raw(".LENGTHUNIT.".to_string())));
    }

    #[test]
    fn test_multiline_record() {
        let text = "ISO-10303-21;\nDATA;\n#1=IFCWALL('g',$,\n  'Wall',$,$,\n  $,$,$,$);\nENDSEC;\nEND-ISO-10303-21;\n";
        let graph = parse(text).unwrap();
        assert_eq!(graph.get(EntityId(1)).unwrap().attrs.len(), 9);
    }

    #[test]
    fn test_string_with_doubled_quotes_and_semicolon() {
        let text = "ISO-10303-21;\nDATA;\n#1=IFCWALL('it''s; a wall',$);\nENDSEC;\nEND-ISO-10303-21;\n";
        let graph = parse(text).unwrap();
        assert_eq!(
            graph.get(EntityId(1)).unwrap().attr(0),
            Some(&AttrValue::Raw("'it''s; a wall'".to_string()))
        );
    }

    #[test]
    fn test_typed_parameter_kept_verbatim() {
        let text = "ISO-10303-21;\nDATA;\n#1=IFCPROPERTYSINGLEVALUE('LoadBearing',$,IFCBOOLEAN(.T.),$);\nENDSEC;\nEND-ISO-10303-21;\n";
        let graph = parse(text).unwrap();
        assert_eq!(
            graph.get(EntityId(1)).unwrap().attr(2),
            Some(&AttrValue::Raw("IFCBOOLEAN(.T.)".to_string()))
        );
    }

    #[test]
    fn test_comments_skipped() {
        let text = "ISO-10303-21;\n/* preamble */\nDATA;\n#1=IFCWALL(/* inline */ $);\nENDSEC;\nEND-ISO-10303-21;\n";
        let graph = parse(text).unwrap();
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_negative_and_scientific_numbers() {
        let text = "ISO-10303-21;\nDATA;\n#1=IFCCARTESIANPOINT((-1.5,2.0E-3,+4.));\nENDSEC;\nEND-ISO-10303-21;\n";
        let graph = parse(text).unwrap();
        let point = graph.get(EntityId(1)).unwrap();
        assert_eq!(
            point.attr(0),
            Some(&AttrValue::List(vec![
                AttrValue::Raw("-1.5".to_string()),
                AttrValue::Raw("2.0E-3".to_string()),
                AttrValue::Raw("+4.".to_string()),
            ]))
        );
    }

    #[test]
    fn test_empty_list() {
        let text = "ISO-10303-21;\nDATA;\n#1=IFCWALL(());\nENDSEC;\nEND-ISO-10303-21;\n";
        let graph = parse(text).unwrap();
        assert_eq!(
            graph.get(EntityId(1)).unwrap().attr(0),
            Some(&AttrValue::List(vec![]))
        );
    }

    #[test]
    fn test_duplicate_id_is_parse_error() {
        let text = "ISO-10303-21;\nDATA;\n#1=IFCWALL($);\n#1=IFCDOOR($);\nENDSEC;\nEND-ISO-10303-21;\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, PruneError::Parse { .. }));
    }

    #[test]
    fn test_missing_iso_marker() {
        let err = parse("DATA;\n#1=IFCWALL($);\nENDSEC;\n").unwrap_err();
        assert!(matches!(err, PruneError::InvalidFile(_)));
    }

    #[test]
    fn test_parse_error_carries_line() {
        let text = "ISO-10303-21;\nDATA;\n#1=IFCWALL(%);\nENDSEC;\nEND-ISO-10303-21;\n";
        match parse(text).unwrap_err() {
            PruneError::Parse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains('%'), "message names the bad character");
            }
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/model.ifc")).unwrap_err();
        assert!(matches!(err, PruneError::FileNotFound(_)));
    }
}
