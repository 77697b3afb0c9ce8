use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LatticeError {
    #[error("Lattice has no tetrahedra")]
    Empty,
    #[error("Tetrahedron {tet} references vertex {vertex}, which does not exist")]
    VertexOutOfRange { tet: usize, vertex: u32 },
    #[error("Tetrahedron {tet} has no volume")]
    Degenerate { tet: usize },
    #[error("Face {face} of tetrahedron {tet} is shared by {owners} tetrahedra")]
    Topology { tet: usize, face: usize, owners: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse lattice configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}
