//! Container writer: persists a model as a VTK XML unstructured grid.
//!
//! One `.vtu` file holds the whole dataset as named binary arrays: the
//! vertex coordinates, the tetrahedral connectivity, the per-element
//! submesh id (`sid`) and one 3-component vector array per field snapshot
//! (`field0`, `field1`, ...). Arrays are inline base64 blocks with a
//! little-endian UInt64 byte-count header, so the file stands alone as a
//! binary scientific container readable by ParaView and friends.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use mmf_model::Model;

use crate::error::Result;

/// VTK cell type code for a linear tetrahedron.
const VTK_TETRA: u8 = 10;

/// Writes one model to a `.vtu` container.
pub struct VtuWriter<'a> {
    model: &'a Model,
}

impl<'a> VtuWriter<'a> {
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        self.write(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn write<W: Write>(&self, out: W) -> Result<()> {
        let mesh = &self.model.mesh;
        let mut writer = Writer::new_with_indent(out, b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;

        let mut vtk_file = BytesStart::new("VTKFile");
        vtk_file.push_attribute(("type", "UnstructuredGrid"));
        vtk_file.push_attribute(("version", "1.0"));
        vtk_file.push_attribute(("byte_order", "LittleEndian"));
        vtk_file.push_attribute(("header_type", "UInt64"));
        writer.write_event(Event::Start(vtk_file))?;

        writer.write_event(Event::Start(BytesStart::new("UnstructuredGrid")))?;

        let mut piece = BytesStart::new("Piece");
        piece.push_attribute(("NumberOfPoints", mesh.n_vertices().to_string().as_str()));
        piece.push_attribute(("NumberOfCells", mesh.n_elements().to_string().as_str()));
        writer.write_event(Event::Start(piece))?;

        writer.write_event(Event::Start(BytesStart::new("Points")))?;
        write_data_array(&mut writer, "Points", "Float64", 3, &self.points_payload())?;
        writer.write_event(Event::End(BytesEnd::new("Points")))?;

        writer.write_event(Event::Start(BytesStart::new("Cells")))?;
        write_data_array(
            &mut writer,
            "connectivity",
            "Int64",
            1,
            &self.connectivity_payload(),
        )?;
        write_data_array(&mut writer, "offsets", "Int64", 1, &self.offsets_payload())?;
        write_data_array(&mut writer, "types", "UInt8", 1, &self.types_payload())?;
        writer.write_event(Event::End(BytesEnd::new("Cells")))?;

        writer.write_event(Event::Start(BytesStart::new("CellData")))?;
        write_data_array(&mut writer, "sid", "UInt64", 1, &self.submesh_payload())?;
        writer.write_event(Event::End(BytesEnd::new("CellData")))?;

        writer.write_event(Event::Start(BytesStart::new("PointData")))?;
        for (index, field) in self.model.fields.fields.iter().enumerate() {
            let name = field_array_name(index, &field.annotation);
            let mut payload = Vec::with_capacity(field.n_vectors() * 3 * 8);
            for vector in &field.vectors {
                for component in vector {
                    payload.extend_from_slice(&component.to_le_bytes());
                }
            }
            write_data_array(&mut writer, &name, "Float64", 3, &payload)?;
        }
        writer.write_event(Event::End(BytesEnd::new("PointData")))?;

        writer.write_event(Event::End(BytesEnd::new("Piece")))?;
        writer.write_event(Event::End(BytesEnd::new("UnstructuredGrid")))?;
        writer.write_event(Event::End(BytesEnd::new("VTKFile")))?;

        Ok(())
    }

    fn points_payload(&self) -> Vec<u8> {
        let mesh = &self.model.mesh;
        let mut payload = Vec::with_capacity(mesh.n_vertices() * 3 * 8);
        for vertex in &mesh.vertices {
            for component in vertex.to_array() {
                payload.extend_from_slice(&component.to_le_bytes());
            }
        }
        payload
    }

    fn connectivity_payload(&self) -> Vec<u8> {
        let mesh = &self.model.mesh;
        let mut payload = Vec::with_capacity(mesh.n_elements() * 4 * 8);
        for element in &mesh.elements {
            for index in element.0 {
                payload.extend_from_slice(&(index as i64).to_le_bytes());
            }
        }
        payload
    }

    fn offsets_payload(&self) -> Vec<u8> {
        let mesh = &self.model.mesh;
        let mut payload = Vec::with_capacity(mesh.n_elements() * 8);
        for element_index in 0..mesh.n_elements() {
            let offset = (element_index as i64 + 1) * 4;
            payload.extend_from_slice(&offset.to_le_bytes());
        }
        payload
    }

    fn types_payload(&self) -> Vec<u8> {
        vec![VTK_TETRA; self.model.mesh.n_elements()]
    }

    fn submesh_payload(&self) -> Vec<u8> {
        let mesh = &self.model.mesh;
        let mut payload = Vec::with_capacity(mesh.n_elements() * 8);
        for id in &mesh.submesh_ids {
            payload.extend_from_slice(&id.to_le_bytes());
        }
        payload
    }
}

/// Array name for snapshot `index`: the field's annotation when present,
/// `field{index}` otherwise.
pub(crate) fn field_array_name(index: usize, annotation: &str) -> String {
    if annotation.is_empty() {
        format!("field{index}")
    } else {
        annotation.to_string()
    }
}

fn write_data_array<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    dtype: &str,
    n_components: usize,
    payload: &[u8],
) -> Result<()> {
    let mut elem = BytesStart::new("DataArray");
    elem.push_attribute(("type", dtype));
    elem.push_attribute(("Name", name));
    if n_components > 1 {
        elem.push_attribute(("NumberOfComponents", n_components.to_string().as_str()));
    }
    elem.push_attribute(("format", "binary"));
    writer.write_event(Event::Start(elem))?;
    writer.write_event(Event::Text(BytesText::new(&encode_block(payload))))?;
    writer.write_event(Event::End(BytesEnd::new("DataArray")))?;
    Ok(())
}

/// Inline VTK binary block: UInt64 byte count followed by the raw data,
/// base64 encoded as a single stream.
pub(crate) fn encode_block(payload: &[u8]) -> String {
    let mut block = Vec::with_capacity(8 + payload.len());
    block.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    block.extend_from_slice(payload);
    base64::encode(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmf_model::{Field, FieldList, Mesh, Model, Tetrahedron, Vertex};
    use std::fs;

    fn single_tet_model() -> Model {
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
        fields.add_field(Field::new(vec![[0.0, 0.0, 1.0]; 4]));
        fields.add_field(Field::new(vec![[1.0, 0.0, 0.0]; 4]));
        Model::new(mesh, fields)
    }

    fn write_to_string(model: &Model) -> String {
        let mut out = Vec::new();
        VtuWriter::new(model).write(&mut out).expect("write should succeed");
        String::from_utf8(out).expect("output is utf8")
    }

    #[test]
    fn writes_all_named_arrays() {
        let xml = write_to_string(&single_tet_model());

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<VTKFile type=\"UnstructuredGrid\""));
        assert!(xml.contains("<Piece NumberOfPoints=\"4\" NumberOfCells=\"1\">"));
        for name in ["Points", "connectivity", "offsets", "types", "sid", "field0", "field1"] {
            assert!(xml.contains(&format!("Name=\"{name}\"")), "missing array {name}");
        }
    }

    #[test]
    fn encodes_connectivity_block() {
        let xml = write_to_string(&single_tet_model());

        let mut payload = Vec::new();
        for index in [0i64, 1, 2, 3] {
            payload.extend_from_slice(&index.to_le_bytes());
        }
        assert!(xml.contains(&encode_block(&payload)));
    }

    #[test]
    fn encodes_block_with_byte_count_header() {
        let encoded = encode_block(&[0xAB; 4]);
        let decoded = base64::decode(encoded).expect("block is valid base64");
        assert_eq!(decoded.len(), 12);
        assert_eq!(u64::from_le_bytes(decoded[0..8].try_into().unwrap()), 4);
        assert_eq!(&decoded[8..], &[0xAB; 4]);
    }

    #[test]
    fn annotated_fields_keep_their_names() {
        let mut model = single_tet_model();
        model.fields.fields[1].annotation = "relaxed".to_string();
        let xml = write_to_string(&model);
        assert!(xml.contains("Name=\"field0\""));
        assert!(xml.contains("Name=\"relaxed\""));
        assert!(!xml.contains("Name=\"field1\""));
    }

    #[test]
    fn writes_container_file() {
        let dir = tempfile::tempdir().expect("create temp directory");
        let path = dir.path().join("model.vtu");

        let model = single_tet_model();
        VtuWriter::new(&model).write_file(&path).expect("file write should succeed");

        let xml = fs::read_to_string(&path).expect("container should be readable");
        assert!(xml.contains("</VTKFile>"));
    }
}
