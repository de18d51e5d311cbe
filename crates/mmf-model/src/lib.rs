//! Mesh and vector-field data model produced by the Tecplot converter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// A tetrahedron as four 0-based vertex indices, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tetrahedron(pub [usize; 4]);

/// One 3-component vector of a field snapshot.
pub type FieldVector = [f64; 3];

/// A vector field defined over all mesh vertices, one vector per vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Free-form label, empty unless a producer attaches one.
    pub annotation: String,
    pub vectors: Vec<FieldVector>,
}

impl Field {
    pub fn new(vectors: Vec<FieldVector>) -> Self {
        Self {
            annotation: String::new(),
            vectors,
        }
    }

    pub fn annotated(annotation: impl Into<String>, vectors: Vec<FieldVector>) -> Self {
        Self {
            annotation: annotation.into(),
            vectors,
        }
    }

    pub fn n_vectors(&self) -> usize {
        self.vectors.len()
    }
}

/// An ordered collection of field snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldList {
    pub fields: Vec<Field>,
}

impl FieldList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Tetrahedral mesh: vertices, connectivity and per-element submesh ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub elements: Vec<Tetrahedron>,
    /// One submesh (material region) id per element, as read from the source.
    pub submesh_ids: Vec<u64>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, elements: Vec<Tetrahedron>, submesh_ids: Vec<u64>) -> Self {
        Self {
            vertices,
            elements,
            submesh_ids,
        }
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }
}

/// A mesh together with its ordered field snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub mesh: Mesh,
    pub fields: FieldList,
}

impl Model {
    pub fn new(mesh: Mesh, fields: FieldList) -> Self {
        Self { mesh, fields }
    }
}

/// Size summary of a model, suitable for reports and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub n_vertices: usize,
    pub n_elements: usize,
    pub n_fields: usize,
    /// Element count per submesh id.
    pub submesh_counts: BTreeMap<u64, usize>,
}

impl ModelSummary {
    pub fn from_model(model: &Model) -> Self {
        let mut submesh_counts = BTreeMap::<u64, usize>::new();
        for id in &model.mesh.submesh_ids {
            *submesh_counts.entry(*id).or_insert(0) += 1;
        }

        Self {
            n_vertices: model.mesh.n_vertices(),
            n_elements: model.mesh.n_elements(),
            n_fields: model.fields.n_fields(),
            submesh_counts,
        }
    }

    pub fn n_submeshes(&self) -> usize {
        self.submesh_counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tet_model() -> Model {
        let mesh = Mesh::new(
            vec![
                Vertex::new(0.0, 0.0, 0.0),
                Vertex::new(1.0, 0.0, 0.0),
                Vertex::new(0.0, 1.0, 0.0),
                Vertex::new(0.0, 0.0, 1.0),
                Vertex::new(1.0, 1.0, 1.0),
            ],
            vec![Tetrahedron([0, 1, 2, 3]), Tetrahedron([1, 2, 3, 4])],
            vec![1, 2],
        );
        let mut fields = FieldList::new();
        fields.add_field(Field::new(vec![[0.0, 0.0, 1.0]; 5]));
        fields.add_field(Field::annotated("relaxed", vec![[1.0, 0.0, 0.0]; 5]));
        Model::new(mesh, fields)
    }

    #[test]
    fn summary_counts_match_model() {
        let model = two_tet_model();
        let summary = ModelSummary::from_model(&model);
        assert_eq!(summary.n_vertices, 5);
        assert_eq!(summary.n_elements, 2);
        assert_eq!(summary.n_fields, 2);
        assert_eq!(summary.n_submeshes(), 2);
        assert_eq!(summary.submesh_counts.get(&1), Some(&1));
        assert_eq!(summary.submesh_counts.get(&2), Some(&1));
    }

    #[test]
    fn summary_tallies_repeated_submesh_ids() {
        let mut model = two_tet_model();
        model.mesh.submesh_ids = vec![7, 7];
        let summary = ModelSummary::from_model(&model);
        assert_eq!(summary.n_submeshes(), 1);
        assert_eq!(summary.submesh_counts.get(&7), Some(&2));
    }

    #[test]
    fn summary_serializes_to_json() {
        let model = two_tet_model();
        let summary = ModelSummary::from_model(&model);
        let json = serde_json::to_string(&summary).expect("summary should serialize");
        let back: ModelSummary = serde_json::from_str(&json).expect("summary should deserialize");
        assert_eq!(back, summary);
    }
}
