//! Incremental reader for MERRILL Tecplot (`*.tec`) files.
//!
//! The format is line oriented but carries no per-line field tags: a line's
//! meaning depends on how much of the dataset has already been filled in.
//! Each line is classified as a zone header, a row of integers or a row of
//! floats; anything else (titles, comments, blank lines) is skipped. Numeric
//! tokens are routed to the coordinate, connectivity, submesh or field
//! component arrays by a pair of slot state machines that advance whenever a
//! target array reaches the size declared by the first zone header.
//!
//! The first zone carries the mesh geometry, connectivity and submesh ids
//! followed by the first field snapshot; every later zone carries one more
//! snapshot and must declare the same `N`/`E` counts.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use mmf_model::{Field, FieldList, Mesh, Model, Tetrahedron, Vertex};

use crate::error::MmfError;

/// Coordinate or field component axis, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Fatal parse conditions. Every variant aborts the parse; no partial model
/// is ever returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TecplotError {
    #[error(
        "zone {zone} declares N={n_verts}, E={n_elems}, but the first zone declared \
         N={expected_verts}, E={expected_elems}"
    )]
    ZoneCountMismatch {
        zone: usize,
        n_verts: usize,
        n_elems: usize,
        expected_verts: usize,
        expected_elems: usize,
    },

    #[error("integer row in zone {zone}: integers may only appear in the first zone")]
    UnexpectedIntegerRow { zone: usize },

    #[error("too many integers for zone: no array can accept `{value}`")]
    TooManyIntegers { value: u64 },

    #[error("too many floats for zone {zone}")]
    TooManyFloats { zone: usize },

    #[error("numeric row before any ZONE declaration")]
    MissingZoneDeclaration,

    #[error("invalid numeric token `{token}`")]
    InvalidToken { token: String },

    #[error("expected {expected} vertex {axis}-coordinates, found {found}")]
    CoordinateCount {
        axis: Axis,
        expected: usize,
        found: usize,
    },

    #[error("expected {expected} tetrahedron vertex indices, found {found}")]
    ConnectivityCount { expected: usize, found: usize },

    #[error("expected {expected} submesh ids, found {found}")]
    SubmeshCount { expected: usize, found: usize },

    #[error("expected {expected} {axis}-component snapshots, found {found}")]
    SnapshotCount {
        axis: Axis,
        expected: usize,
        found: usize,
    },

    #[error("snapshot {snapshot}: expected {expected} {axis}-components, found {found}")]
    ComponentCount {
        snapshot: usize,
        axis: Axis,
        expected: usize,
        found: usize,
    },
}

/// Read and parse a Tecplot file into a validated model.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Model, MmfError> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file))
}

/// Parse Tecplot text from any buffered reader.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<Model, MmfError> {
    let mut acc = Accumulator::default();
    for line in reader.lines() {
        let line = line?;
        acc.consume_line(&line)?;
    }
    Ok(acc.finish()?)
}

/// Parse Tecplot text held in memory.
pub fn parse_str(src: &str) -> Result<Model, TecplotError> {
    let mut acc = Accumulator::default();
    for line in src.lines() {
        acc.consume_line(line)?;
    }
    acc.finish()
}

fn zone_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"^\s*ZONE\s*T\s*=\s*"([A-Za-z0-9=\-.,;\s]+)?"\s*,?\s*(?:N\s*=\s*([0-9]+)\s*,?\s*E\s*=\s*([0-9]+)|E\s*=\s*([0-9]+)\s*,?\s*N\s*=\s*([0-9]+))\s*$"#,
        )
        .expect("zone header pattern is valid")
    })
}

fn integer_row_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*[0-9]+(\s+[0-9]+)*\s*$").expect("integer row pattern is valid")
    })
}

fn float_row_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^\s*[-+]?[0-9]*\.?[0-9]+([eE][-+]?[0-9]+)?(\s+[-+]?[0-9]*\.?[0-9]+([eE][-+]?[0-9]+)?)*\s*$",
        )
        .expect("float row pattern is valid")
    })
}

/// One classified input line.
#[derive(Debug, Clone, PartialEq)]
enum Line<'a> {
    Zone {
        title: String,
        n_verts: usize,
        n_elems: usize,
    },
    Integers(Vec<&'a str>),
    Floats(Vec<&'a str>),
    Unrecognized,
}

/// Classify one physical line. Trial order is fixed: zone header, integer
/// row, float row. Lines matching none of the three are skippable text.
fn classify(line: &str) -> Line<'_> {
    if let Some(caps) = zone_regex().captures(line) {
        let title = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        // N/E may appear in either order; the alternation captures one pair.
        let (n, e) = match (caps.get(2), caps.get(3), caps.get(4), caps.get(5)) {
            (Some(n), Some(e), _, _) => (n, e),
            (_, _, Some(e), Some(n)) => (n, e),
            _ => return Line::Unrecognized,
        };
        let (Ok(n_verts), Ok(n_elems)) = (n.as_str().parse::<usize>(), e.as_str().parse::<usize>())
        else {
            return Line::Unrecognized;
        };
        return Line::Zone {
            title,
            n_verts,
            n_elems,
        };
    }

    if integer_row_regex().is_match(line) {
        return Line::Integers(line.split_whitespace().collect());
    }

    if float_row_regex().is_match(line) {
        return Line::Floats(line.split_whitespace().collect());
    }

    Line::Unrecognized
}

/// Parse progress: expected counts are unknown until the first zone header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParseState {
    #[default]
    NotStarted,
    Parsing {
        n_verts: usize,
        n_elems: usize,
        current: usize,
    },
}

/// Destination of the next integer token within the first zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum IntSlot {
    #[default]
    SubmeshIds,
    Connectivity,
    Done,
}

/// Destination of the next float token within the current zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FloatSlot {
    #[default]
    CoordX,
    CoordY,
    CoordZ,
    FieldX,
    FieldY,
    FieldZ,
    Done,
}

/// Mutable parse state: expected counts, the current zone, and the growing
/// raw arrays that the model is projected from once validated.
#[derive(Debug, Default)]
struct Accumulator {
    state: ParseState,
    int_slot: IntSlot,
    float_slot: FloatSlot,

    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,

    /// Flattened connectivity, 4 indices per tetrahedron, already 0-based.
    connectivity: Vec<usize>,
    submesh_ids: Vec<u64>,

    /// Per-zone field components, one inner array per snapshot.
    mx: Vec<Vec<f64>>,
    my: Vec<Vec<f64>>,
    mz: Vec<Vec<f64>>,

    /// Zone titles in arrival order; the realized zone count at finish.
    zone_titles: Vec<String>,
}

impl Accumulator {
    fn consume_line(&mut self, line: &str) -> Result<(), TecplotError> {
        match classify(line) {
            Line::Zone {
                title,
                n_verts,
                n_elems,
            } => self.open_zone(title, n_verts, n_elems),
            Line::Integers(tokens) => self.route_integers(&tokens),
            Line::Floats(tokens) => self.route_floats(&tokens),
            Line::Unrecognized => Ok(()),
        }
    }

    /// React to a zone header. The first zone fixes the expected counts and
    /// allocates snapshot slot 0; later zones must agree with it and open
    /// the next snapshot slot.
    fn open_zone(
        &mut self,
        title: String,
        n_verts: usize,
        n_elems: usize,
    ) -> Result<(), TecplotError> {
        match self.state {
            ParseState::NotStarted => {
                self.state = ParseState::Parsing {
                    n_verts,
                    n_elems,
                    current: 0,
                };

                self.x.reserve(n_verts);
                self.y.reserve(n_verts);
                self.z.reserve(n_verts);
                self.connectivity.reserve(4 * n_elems);
                self.submesh_ids.reserve(n_elems);

                self.mx.push(Vec::with_capacity(n_verts));
                self.my.push(Vec::with_capacity(n_verts));
                self.mz.push(Vec::with_capacity(n_verts));

                self.int_slot = IntSlot::SubmeshIds;
                self.float_slot = FloatSlot::CoordX;
            }
            ParseState::Parsing {
                n_verts: expected_verts,
                n_elems: expected_elems,
                current,
            } => {
                if n_verts != expected_verts || n_elems != expected_elems {
                    return Err(TecplotError::ZoneCountMismatch {
                        zone: current + 1,
                        n_verts,
                        n_elems,
                        expected_verts,
                        expected_elems,
                    });
                }

                self.state = ParseState::Parsing {
                    n_verts,
                    n_elems,
                    current: current + 1,
                };

                self.mx.push(Vec::with_capacity(n_verts));
                self.my.push(Vec::with_capacity(n_verts));
                self.mz.push(Vec::with_capacity(n_verts));

                // Coordinates belong solely to the first zone.
                self.float_slot = FloatSlot::FieldX;
            }
        }

        self.zone_titles.push(title);
        Ok(())
    }

    /// Route an integer row. Integers are legal only in the first zone:
    /// submesh ids first, then connectivity (1-based in the source, stored
    /// 0-based).
    fn route_integers(&mut self, tokens: &[&str]) -> Result<(), TecplotError> {
        let ParseState::Parsing { current, .. } = self.state else {
            return Err(TecplotError::MissingZoneDeclaration);
        };
        if current != 0 {
            return Err(TecplotError::UnexpectedIntegerRow { zone: current });
        }

        for token in tokens {
            let value: u64 = token.parse().map_err(|_| TecplotError::InvalidToken {
                token: (*token).to_string(),
            })?;

            self.advance_int_slot();
            match self.int_slot {
                IntSlot::SubmeshIds => self.submesh_ids.push(value),
                IntSlot::Connectivity => {
                    if value == 0 {
                        // The source is 1-based; 0 cannot name a vertex.
                        return Err(TecplotError::InvalidToken {
                            token: (*token).to_string(),
                        });
                    }
                    self.connectivity.push((value - 1) as usize);
                }
                IntSlot::Done => return Err(TecplotError::TooManyIntegers { value }),
            }
        }

        Ok(())
    }

    /// Route a float row: coordinates (first zone only), then the current
    /// snapshot's x/y/z components.
    fn route_floats(&mut self, tokens: &[&str]) -> Result<(), TecplotError> {
        let ParseState::Parsing { current, .. } = self.state else {
            return Err(TecplotError::MissingZoneDeclaration);
        };

        for token in tokens {
            let value: f64 = token.parse().map_err(|_| TecplotError::InvalidToken {
                token: (*token).to_string(),
            })?;

            self.advance_float_slot();
            match self.float_slot {
                FloatSlot::CoordX => self.x.push(value),
                FloatSlot::CoordY => self.y.push(value),
                FloatSlot::CoordZ => self.z.push(value),
                FloatSlot::FieldX => self.mx[current].push(value),
                FloatSlot::FieldY => self.my[current].push(value),
                FloatSlot::FieldZ => self.mz[current].push(value),
                FloatSlot::Done => return Err(TecplotError::TooManyFloats { zone: current }),
            }
        }

        Ok(())
    }

    /// Move the integer slot past every array that is already at its
    /// expected size. Transitions are deterministic in array fill order.
    fn advance_int_slot(&mut self) {
        let ParseState::Parsing { n_elems, .. } = self.state else {
            return;
        };

        loop {
            let next = match self.int_slot {
                IntSlot::SubmeshIds if self.submesh_ids.len() >= n_elems => IntSlot::Connectivity,
                IntSlot::Connectivity if self.connectivity.len() >= 4 * n_elems => IntSlot::Done,
                _ => break,
            };
            self.int_slot = next;
        }
    }

    /// Move the float slot past every array that is already at its expected
    /// size. Later zones start at `FieldX`, so the coordinate states are
    /// only ever visited under the first zone.
    fn advance_float_slot(&mut self) {
        let ParseState::Parsing {
            n_verts, current, ..
        } = self.state
        else {
            return;
        };

        loop {
            let next = match self.float_slot {
                FloatSlot::CoordX if self.x.len() >= n_verts => FloatSlot::CoordY,
                FloatSlot::CoordY if self.y.len() >= n_verts => FloatSlot::CoordZ,
                FloatSlot::CoordZ if self.z.len() >= n_verts => FloatSlot::FieldX,
                FloatSlot::FieldX if self.mx[current].len() >= n_verts => FloatSlot::FieldY,
                FloatSlot::FieldY if self.my[current].len() >= n_verts => FloatSlot::FieldZ,
                FloatSlot::FieldZ if self.mz[current].len() >= n_verts => FloatSlot::Done,
                _ => break,
            };
            self.float_slot = next;
        }
    }

    /// Validate every size invariant and project the raw arrays into the
    /// normalized model. All-or-nothing: the first violated invariant is
    /// returned and no model is produced.
    fn finish(self) -> Result<Model, TecplotError> {
        self.validate()?;
        Ok(self.into_model())
    }

    fn validate(&self) -> Result<(), TecplotError> {
        let ParseState::Parsing {
            n_verts, n_elems, ..
        } = self.state
        else {
            return Err(TecplotError::MissingZoneDeclaration);
        };

        let n_zones = self.zone_titles.len();

        for (axis, coords) in [(Axis::X, &self.x), (Axis::Y, &self.y), (Axis::Z, &self.z)] {
            if coords.len() != n_verts {
                return Err(TecplotError::CoordinateCount {
                    axis,
                    expected: n_verts,
                    found: coords.len(),
                });
            }
        }

        if self.connectivity.len() != 4 * n_elems {
            return Err(TecplotError::ConnectivityCount {
                expected: 4 * n_elems,
                found: self.connectivity.len(),
            });
        }
        if self.submesh_ids.len() != n_elems {
            return Err(TecplotError::SubmeshCount {
                expected: n_elems,
                found: self.submesh_ids.len(),
            });
        }

        for (axis, components) in [
            (Axis::X, &self.mx),
            (Axis::Y, &self.my),
            (Axis::Z, &self.mz),
        ] {
            if components.len() != n_zones {
                return Err(TecplotError::SnapshotCount {
                    axis,
                    expected: n_zones,
                    found: components.len(),
                });
            }
            for (snapshot, component) in components.iter().enumerate() {
                if component.len() != n_verts {
                    return Err(TecplotError::ComponentCount {
                        snapshot,
                        axis,
                        expected: n_verts,
                        found: component.len(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Pure projection of a validated accumulator, always in arrival order.
    fn into_model(self) -> Model {
        let vertices = self
            .x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((&x, &y), &z)| Vertex::new(x, y, z))
            .collect();

        let elements = self
            .connectivity
            .chunks_exact(4)
            .map(|chunk| Tetrahedron([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        let mesh = Mesh::new(vertices, elements, self.submesh_ids);

        let mut fields = FieldList::new();
        for ((mx, my), mz) in self.mx.into_iter().zip(self.my).zip(self.mz) {
            let vectors = mx
                .iter()
                .zip(&my)
                .zip(&mz)
                .map(|((&vx, &vy), &vz)| [vx, vy, vz])
                .collect();
            fields.add_field(Field::new(vectors));
        }

        Model::new(mesh, fields)
    }
}
