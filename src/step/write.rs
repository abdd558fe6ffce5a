//
//  write.rs
//  ifcprune
//

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::model::{AttrValue, GraphModel};

/// Serialize a graph to STEP physical file text.
///
/// Entities are emitted in ascending id order; the source header records
/// are re-emitted verbatim, with a minimal default header when none exist.
pub fn to_step_string(graph: &GraphModel) -> String {
    let mut out = String::new();
    out.push_str("ISO-10303-21;\n");
    out.push_str("HEADER;\n");
    if graph.header().is_empty() {
        out.push_str("FILE_DESCRIPTION((''),'2;1');\n");
        out.push_str("FILE_NAME('','',(''),(''),'','','');\n");
        out.push_str("FILE_SCHEMA(('IFC4'));\n");
    } else {
        for record in graph.header() {
            out.push_str(record);
            out.push_str(";\n");
        }
    }
    out.push_str("ENDSEC;\n");
    out.push_str("DATA;\n");

    for entity in graph.iter() {
        let _ = write!(out, "#{}={}(", entity.id.0, entity.ty);
        for (i, attr) in entity.attrs.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_attr(&mut out, attr);
        }
        out.push_str(");\n");
    }

    out.push_str("ENDSEC;\n");
    out.push_str("END-ISO-10303-21;\n");
    out
}

fn write_attr(out: &mut String, value: &AttrValue) {
    match value {
        AttrValue::Null => out.push('$'),
        AttrValue::Derived => out.push('*'),
        AttrValue::Raw(raw) => out.push_str(raw),
        AttrValue::Ref(id) => {
            let _ = write!(out, "#{}", id.0);
        }
        AttrValue::List(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_attr(out, item);
            }
            out.push(')');
        }
    }
}

/// Write a graph to disk atomically: serialize to a temporary file next to
/// the destination, sync, then rename into place. A failed write never
/// leaves a half-written output file.
pub fn write(graph: &GraphModel, path: &Path) -> Result<()> {
    let content = to_step_string(graph);
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    debug!(entities = graph.len(), path = %path.display(), "model written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, EntityId};
    use crate::step::parse;

    fn sample() -> GraphModel {
        let mut graph = GraphModel::new();
        graph.set_header(vec!["FILE_SCHEMA(('IFC4'))".to_string()]);
        graph.insert(Entity::new(
            EntityId(1),
            "IFCWALL",
            vec![
                AttrValue::Raw("'guid'".to_string()),
                AttrValue::Null,
                AttrValue::Derived,
                AttrValue::List(vec![AttrValue::Ref(EntityId(2)), AttrValue::Raw("1.5".to_string())]),
            ],
        ));
        graph.insert(Entity::new(EntityId(2), "IFCDOOR", vec![]));
        graph
    }

    #[test]
    fn test_serialization_shape() {
        let text = to_step_string(&sample());
        assert!(text.starts_with("ISO-10303-21;\n"));
        assert!(text.contains("FILE_SCHEMA(('IFC4'));\n"));
        assert!(text.contains("#1=IFCWALL('guid',$,*,(#2,1.5));\n"));
        assert!(text.contains("#2=IFCDOOR();\n"));
        assert!(text.ends_with("END-ISO-10303-21;\n"));
    }

    #[test]
    fn test_default_header_when_source_had_none() {
        let graph = GraphModel::new();
        let text = to_step_string(&graph);
        assert!(text.contains("FILE_DESCRIPTION"));
        assert!(text.contains("FILE_SCHEMA(('IFC4'));\n"));
    }

    #[test]
    fn test_roundtrip() {
        let graph = sample();
        let reparsed = parse(&to_step_string(&graph)).unwrap();

        assert_eq!(reparsed.len(), graph.len());
        assert_eq!(reparsed.header(), graph.header());
        for entity in graph.iter() {
            assert_eq!(reparsed.get(entity.id).unwrap(), entity);
        }
    }

    #[test]
    fn test_atomic_write_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ifc");

        write(&sample(), &path).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists(), "temp file renamed away");
        let loaded = crate::step::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
    }
}
