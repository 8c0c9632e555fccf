//! Errors surfaced by loading, validating and editing meshes.
//!
//! Every [`MeshError`] maps to a stable [`ErrorCode`] (`MESH-NNNN`), an
//! optional [`MeshLocation`] and a [`RecoverySuggestion`] naming the
//! subcommand or setting most likely to help. Codes are grouped by the
//! thousands digit:
//!
//! | Range | Concern |
//! |-------|---------|
//! | 1xxx  | reading and writing files |
//! | 2xxx  | mesh data and parameter validation |
//! | 3xxx  | an operation gave up on its input |
//! | 4xxx  | file formats |
//!
//! Per-hole outcomes (rejected, skipped, unfaired patches) are not errors.
//! They are reported through [`crate::HoleRepairReport`] and never abort a run.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

pub type MeshResult<T> = Result<T, MeshError>;

/// Stable numeric code of a [`MeshError`], printed as `MESH-NNNN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    IoRead = 1001,
    IoWrite = 1002,
    ParseError = 1003,
    InvalidVertexIndex = 2001,
    InvalidCoordinate = 2002,
    EmptyMesh = 2003,
    InvalidTopology = 2004,
    InvalidParameter = 2009,
    HoleFillFailed = 3002,
    SimplifyFailed = 3004,
    UnsupportedFormat = 4001,
}

impl ErrorCode {
    pub fn number(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MESH-{:04}", self.number())
    }
}

/// What a user can try after an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Run another mesh-holes subcommand on the input first.
    RunFirst { command: &'static str },
    /// Export the data again, preferably in the given format.
    Reexport { format: &'static str },
    /// Pick a different value for a setting.
    Adjust { parameter: String, hint: &'static str },
    /// Look at the file or directory involved.
    CheckPath { path: PathBuf, what: &'static str },
}

impl fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunFirst { command } => write!(f, "run `mesh-holes {}` on the input first", command),
            Self::Reexport { format } => write!(f, "re-export the mesh as {}", format),
            Self::Adjust { parameter, hint } => write!(f, "adjust {}: {}", parameter, hint),
            Self::CheckPath { path, what } => write!(f, "check that {} {}", path.display(), what),
        }
    }
}

/// Where in the input an error was detected.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshLocation {
    Vertex(usize),
    Face(usize),
    /// Directed edge between two input vertex indices.
    Edge(u32, u32),
    File(PathBuf),
}

impl fmt::Display for MeshLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex(i) => write!(f, "vertex {}", i),
            Self::Face(i) => write!(f, "face {}", i),
            Self::Edge(a, b) => write!(f, "edge {} -> {}", a, b),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum MeshError {
    #[error("failed to read mesh from {path}")]
    #[diagnostic(code(mesh::io::read))]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write mesh to {path}")]
    #[diagnostic(code(mesh::io::write))]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {details}")]
    #[diagnostic(code(mesh::io::parse), help("the file may be truncated or use an unusual variant of its format"))]
    ParseError { path: PathBuf, details: String },

    #[error("unsupported mesh format: {extension:?}")]
    #[diagnostic(code(mesh::format::unsupported), help("use a .ply, .obj or .stl file"))]
    UnsupportedFormat { extension: Option<String> },

    #[error("mesh is empty: {details}")]
    #[diagnostic(code(mesh::validate::empty))]
    EmptyMesh { details: String },

    /// Connectivity that cannot be stored as an oriented half-edge mesh.
    #[error("invalid mesh topology: {details}")]
    #[diagnostic(code(mesh::validate::topology), help("`mesh-holes repair-soup` merges, cleans and orients polygon soups"))]
    InvalidTopology { details: String, edge: Option<(u32, u32)> },

    #[error("face {face_index} references vertex {vertex_index}, but the mesh only has {vertex_count} vertices")]
    #[diagnostic(code(mesh::validate::vertex_index))]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    #[error("vertex {vertex_index} has {coordinate} = {value}")]
    #[diagnostic(code(mesh::validate::coordinate))]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    #[error("invalid parameter {name} = {value}: {reason}")]
    #[diagnostic(code(mesh::config::parameter))]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A filler could not build a valid patch for one hole.
    #[error("hole filling failed: {details}")]
    #[diagnostic(code(mesh::holes::fill))]
    HoleFillFailed { details: String },

    #[error("simplification failed: {details}")]
    #[diagnostic(code(mesh::simplify::failed))]
    SimplifyFailed { details: String },
}

impl MeshError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::IoRead { .. } => ErrorCode::IoRead,
            Self::IoWrite { .. } => ErrorCode::IoWrite,
            Self::ParseError { .. } => ErrorCode::ParseError,
            Self::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            Self::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            Self::InvalidTopology { .. } => ErrorCode::InvalidTopology,
            Self::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            Self::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            Self::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            Self::HoleFillFailed { .. } => ErrorCode::HoleFillFailed,
            Self::SimplifyFailed { .. } => ErrorCode::SimplifyFailed,
        }
    }

    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            Self::IoRead { path, .. } => RecoverySuggestion::CheckPath {
                path: path.clone(),
                what: "exists and is readable",
            },
            Self::IoWrite { path, .. } => RecoverySuggestion::CheckPath {
                path: path.clone(),
                what: "is in a writable directory",
            },
            Self::ParseError { .. } | Self::EmptyMesh { .. } | Self::InvalidCoordinate { .. } => {
                RecoverySuggestion::Reexport { format: "ASCII PLY" }
            }
            Self::UnsupportedFormat { .. } => RecoverySuggestion::Reexport { format: "PLY, OBJ or STL" },
            Self::InvalidTopology { .. } | Self::InvalidVertexIndex { .. } | Self::SimplifyFailed { .. } => {
                RecoverySuggestion::RunFirst { command: "repair-soup" }
            }
            Self::InvalidParameter { name, .. } => RecoverySuggestion::Adjust {
                parameter: (*name).to_string(),
                hint: "see --help for the accepted range",
            },
            Self::HoleFillFailed { .. } => RecoverySuggestion::Adjust {
                parameter: "max_num_hole_edges".to_string(),
                hint: "leave holes this complex open",
            },
        }
    }

    pub fn location(&self) -> Option<MeshLocation> {
        match self {
            Self::InvalidVertexIndex { face_index, .. } => Some(MeshLocation::Face(*face_index)),
            Self::InvalidCoordinate { vertex_index, .. } => Some(MeshLocation::Vertex(*vertex_index)),
            Self::InvalidTopology { edge: Some((a, b)), .. } => Some(MeshLocation::Edge(*a, *b)),
            Self::ParseError { path, .. } | Self::IoRead { path, .. } | Self::IoWrite { path, .. } => {
                Some(MeshLocation::File(path.clone()))
            }
            _ => None,
        }
    }

    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoRead { path: path.into(), source }
    }

    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoWrite { path: path.into(), source }
    }

    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::ParseError { path: path.into(), details: details.into() }
    }

    pub fn empty_mesh(details: impl Into<String>) -> Self {
        Self::EmptyMesh { details: details.into() }
    }

    /// `edge` is the offending directed edge in input vertex indices, if known.
    pub fn invalid_topology(details: impl Into<String>, edge: Option<(u32, u32)>) -> Self {
        Self::InvalidTopology { details: details.into(), edge }
    }

    pub fn invalid_parameter(name: &'static str, value: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn hole_fill_failed(details: impl Into<String>) -> Self {
        Self::HoleFillFailed { details: details.into() }
    }

    pub fn simplify_failed(details: impl Into<String>) -> Self {
        Self::SimplifyFailed { details: details.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_zero_padded() {
        let err = MeshError::invalid_parameter("edge_keep_ratio", 1.5, "must be in (0, 1]");
        assert_eq!(err.code(), ErrorCode::InvalidParameter);
        assert_eq!(err.code().to_string(), "MESH-2009");
        assert_eq!(ErrorCode::IoRead.number(), 1001);
    }

    #[test]
    fn topology_errors_point_at_soup_repair() {
        let err = MeshError::invalid_topology("edge used twice", Some((3, 4)));
        assert_eq!(
            err.recovery_suggestion(),
            RecoverySuggestion::RunFirst { command: "repair-soup" }
        );
        assert_eq!(err.location(), Some(MeshLocation::Edge(3, 4)));
        assert_eq!(err.location().map(|l| l.to_string()).as_deref(), Some("edge 3 -> 4"));

        assert!(MeshError::invalid_topology("dangling", None).location().is_none());
    }

    #[test]
    fn io_errors_name_the_file() {
        let err = MeshError::io_write("/tmp/out/mesh.ply", std::io::Error::other("denied"));
        assert_eq!(err.location(), Some(MeshLocation::File("/tmp/out/mesh.ply".into())));
        assert!(err.recovery_suggestion().to_string().contains("writable"));
    }

    #[test]
    fn vertex_index_message() {
        let err = MeshError::InvalidVertexIndex {
            face_index: 5,
            vertex_index: 100,
            vertex_count: 50,
        };
        assert_eq!(
            err.to_string(),
            "face 5 references vertex 100, but the mesh only has 50 vertices"
        );
        assert_eq!(err.location(), Some(MeshLocation::Face(5)));
    }

    #[test]
    fn parameter_error_display() {
        let err = MeshError::invalid_parameter("num_iterations", 0, "must be positive");
        assert_eq!(err.to_string(), "invalid parameter num_iterations = 0: must be positive");
    }
}
