//! Visualization-descriptor writer: ParaView collection (`.pvd`) files.
//!
//! The descriptor declares one temporal entry per field snapshot, each
//! referencing the container file by path, so a time-series viewer can step
//! through the snapshots of a single converted dataset.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use mmf_model::Model;

use crate::error::Result;

/// Writes the temporal descriptor for one model/container pair.
pub struct PvdWriter<'a> {
    model: &'a Model,
    container_path: &'a str,
}

impl<'a> PvdWriter<'a> {
    pub fn new(model: &'a Model, container_path: &'a str) -> Self {
        Self {
            model,
            container_path,
        }
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        self.write(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn write<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;

        let mut vtk_file = BytesStart::new("VTKFile");
        vtk_file.push_attribute(("type", "Collection"));
        vtk_file.push_attribute(("version", "0.1"));
        vtk_file.push_attribute(("byte_order", "LittleEndian"));
        writer.write_event(Event::Start(vtk_file))?;

        writer.write_event(Event::Start(BytesStart::new("Collection")))?;

        for snapshot in 0..self.model.fields.n_fields() {
            let mut entry = BytesStart::new("DataSet");
            entry.push_attribute(("timestep", snapshot.to_string().as_str()));
            entry.push_attribute(("group", ""));
            entry.push_attribute(("part", "0"));
            entry.push_attribute(("file", self.container_path));
            writer.write_event(Event::Empty(entry))?;
        }

        writer.write_event(Event::End(BytesEnd::new("Collection")))?;
        writer.write_event(Event::End(BytesEnd::new("VTKFile")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmf_model::{Field, FieldList, Mesh, Model, Tetrahedron, Vertex};
    use std::fs;

    fn model_with_snapshots(n: usize) -> Model {
        let mesh = Mesh::new(
            vec![
                Vertex::new(0.0, 0.0, 0.0),
                Vertex::new(1.0, 0.0, 0.0),
                Vertex::new(0.0, 1.0, 0.0),
                Vertex::new(0.0, 0.0, 1.0),
            ],
            vec![Tetrahedron([0, 1, 2, 3])],
            vec![1],
        );
        let mut fields = FieldList::new();
        for _ in 0..n {
            fields.add_field(Field::new(vec![[0.0, 0.0, 1.0]; 4]));
        }
        Model::new(mesh, fields)
    }

    fn write_to_string(model: &Model, container: &str) -> String {
        let mut out = Vec::new();
        PvdWriter::new(model, container)
            .write(&mut out)
            .expect("write should succeed");
        String::from_utf8(out).expect("output is utf8")
    }

    #[test]
    fn declares_one_entry_per_snapshot() {
        let model = model_with_snapshots(3);
        let xml = write_to_string(&model, "run.vtu");

        assert!(xml.contains("<VTKFile type=\"Collection\""));
        assert_eq!(xml.matches("<DataSet ").count(), 3);
        for timestep in 0..3 {
            assert!(xml.contains(&format!("timestep=\"{timestep}\"")));
        }
        assert_eq!(xml.matches("file=\"run.vtu\"").count(), 3);
    }

    #[test]
    fn empty_field_list_yields_empty_collection() {
        let model = model_with_snapshots(0);
        let xml = write_to_string(&model, "run.vtu");
        assert!(!xml.contains("<DataSet"));
        assert!(xml.contains("<Collection>"));
    }

    #[test]
    fn writes_descriptor_file() {
        let dir = tempfile::tempdir().expect("create temp directory");
        let path = dir.path().join("model.pvd");

        let model = model_with_snapshots(2);
        PvdWriter::new(&model, "model.vtu")
            .write_file(&path)
            .expect("file write should succeed");

        let xml = fs::read_to_string(&path).expect("descriptor should be readable");
        assert_eq!(xml.matches("<DataSet ").count(), 2);
    }
}
