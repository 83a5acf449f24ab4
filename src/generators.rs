//! Document generators (§4.3, C3): lazy, single-pass sequences of `(doc, err)` built from a
//! byte stream. Mirrors the original's `docChan <-chan Doc` shape directly — a producer thread
//! parses and a channel-backed `Iterator` pulls — rather than fighting serde's push-based
//! visitors into a pull interface. The JSON-array case reuses the teacher's streaming
//! seq-visitor trick (`array_each` in `meilisearch-types/src/document_formats.rs`) so a huge
//! array is never buffered in full.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc;
use std::thread;

use serde::de::{Deserializer, SeqAccess, Visitor};
use serde_json::Value;

use crate::document::RawDoc;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Json,
    JsonLines,
    Csv,
}

pub type DocItem = Result<RawDoc, Error>;

/// Starts a background thread that parses `reader` according to `kind` and returns an iterator
/// pulling `(doc, err)` items off of it. The sequence is finite, single-pass, not restartable;
/// the orchestrator (not the generator) is responsible for closing the underlying stream.
pub fn generate<R>(kind: DocKind, reader: R) -> impl Iterator<Item = DocItem>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<DocItem>(16);
    thread::spawn(move || {
        let send = |item: DocItem| tx.send(item).is_ok();
        match kind {
            DocKind::Json => generate_json(reader, &send),
            DocKind::JsonLines => generate_json_lines(reader, &send),
            DocKind::Csv => generate_csv(reader, &send),
        }
    });
    rx.into_iter()
}

fn generate_json(reader: impl Read, send: &dyn Fn(DocItem) -> bool) {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let result = array_each(&mut de, send);
    if let Err(e) = result {
        send(Err(Error::GeneratorParse(format!("expected a JSON array: {e}"))));
    }
}

/// The teacher's streaming-seq-visitor trick: deserialize a top-level JSON array one element at
/// a time without materializing the whole thing, invoking `send` per element.
fn array_each<'de, D>(
    deserializer: D,
    send: &dyn Fn(DocItem) -> bool,
) -> std::result::Result<(), D::Error>
where
    D: Deserializer<'de>,
{
    struct SeqVisitor<'a>(&'a dyn Fn(DocItem) -> bool);

    impl<'de, 'a> Visitor<'de> for SeqVisitor<'a> {
        type Value = ();

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a JSON array of objects")
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
        where
            A: SeqAccess<'de>,
        {
            loop {
                let item = match seq.next_element::<Value>() {
                    Ok(Some(v)) => v,
                    Ok(None) => break,
                    Err(e) => {
                        (self.0)(Err(Error::GeneratorParse(e.to_string())));
                        break;
                    }
                };
                let doc_item = match item {
                    Value::Object(map) => Ok(map),
                    other => Err(Error::GeneratorParse(format!(
                        "expected an object, found {other}"
                    ))),
                };
                if !(self.0)(doc_item) {
                    break;
                }
            }
            Ok(())
        }
    }

    deserializer.deserialize_seq(SeqVisitor(send))
}

fn generate_json_lines(reader: impl Read, send: &dyn Fn(DocItem) -> bool) {
    let buf = BufReader::new(reader);
    for line in buf.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                if !send(Err(Error::GeneratorParse(e.to_string()))) {
                    return;
                }
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let doc_item: DocItem = serde_json::from_str::<Value>(&line)
            .map_err(|e| Error::GeneratorParse(e.to_string()))
            .and_then(|v| match v {
                Value::Object(map) => Ok(map),
                other => Err(Error::GeneratorParse(format!(
                    "expected an object, found {other}"
                ))),
            });
        if !send(doc_item) {
            return;
        }
    }
}

fn generate_csv(reader: impl Read, send: &dyn Fn(DocItem) -> bool) {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);
    let headers = match rdr.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            send(Err(Error::GeneratorParse(e.to_string())));
            return;
        }
    };

    for record in rdr.records() {
        let doc_item = match record {
            Ok(rec) if rec.len() == headers.len() => {
                let mut map = RawDoc::new();
                for (name, value) in headers.iter().zip(rec.iter()) {
                    map.insert(name.to_string(), Value::String(value.to_string()));
                }
                Ok(map)
            }
            Ok(rec) => Err(Error::GeneratorParse(format!(
                "row has {} columns, expected {}",
                rec.len(),
                headers.len()
            ))),
            Err(e) => Err(Error::GeneratorParse(e.to_string())),
        };
        if !send(doc_item) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn json_array_of_objects() {
        let input = br#"[{"a":1},{"a":2}]"#.to_vec();
        let docs: Vec<_> = generate(DocKind::Json, Cursor::new(input)).collect();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.is_ok()));
    }

    #[test]
    fn json_lines_skips_blank_and_recovers_from_bad_line() {
        let input = b"{\"a\":1}\n\nnot json\n{\"a\":3}\n".to_vec();
        let docs: Vec<_> = generate(DocKind::JsonLines, Cursor::new(input)).collect();
        assert_eq!(docs.len(), 3);
        assert!(docs[0].is_ok());
        assert!(docs[1].is_err());
        assert!(docs[2].is_ok());
    }

    #[test]
    fn csv_header_then_rows() {
        let input = b"name,age\nAda,36\nGrace,85\n".to_vec();
        let docs: Vec<_> = generate(DocKind::Csv, Cursor::new(input)).collect();
        assert_eq!(docs.len(), 2);
        let first = docs[0].as_ref().unwrap();
        assert_eq!(first.get("name").unwrap(), "Ada");
        assert_eq!(first.get("age").unwrap(), "36");
    }

    #[test]
    fn csv_row_with_wrong_column_count_yields_error_without_aborting() {
        let input = b"name,age\nAda,36\nBad\nGrace,85\n".to_vec();
        let docs: Vec<_> = generate(DocKind::Csv, Cursor::new(input)).collect();
        assert_eq!(docs.len(), 3);
        assert!(docs[0].is_ok());
        assert!(docs[1].is_err());
        assert!(docs[2].is_ok());
    }
}
