//! Mesh file I/O for PLY, OBJ, and STL formats.
//!
//! Files are read as polygon soups first. [`load_mesh`] fan-triangulates the
//! polygons and validates the result, [`load_polygon_soup`] hands them back
//! untouched for [`repair_polygon_soup`](crate::soup::repair_polygon_soup).

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Vector3;
use ply_rs::ply::Property;
use tracing::{debug, info, warn};

use crate::error::{MeshError, MeshResult};
use crate::soup::PolygonSoup;
use crate::tracing_ext::log_io_operation;
use crate::types::{Mesh, Triangle, Vertex, VertexColor};
use crate::validate::validate_mesh_data;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Ply,
    Obj,
    Stl,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "ply" => Some(MeshFormat::Ply),
                "obj" => Some(MeshFormat::Obj),
                "stl" => Some(MeshFormat::Stl),
                _ => None,
            })
    }

    fn require(path: &Path) -> MeshResult<Self> {
        Self::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
            extension: path.extension().and_then(|e| e.to_str()).map(String::from),
        })
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MeshFormat::Ply => "PLY",
            MeshFormat::Obj => "OBJ",
            MeshFormat::Stl => "STL",
        })
    }
}

/// Load a triangle mesh, auto-detecting format from extension.
///
/// Polygons are fan-triangulated. Triangles that repeat a corner are dropped.
/// The result is checked with [`validate_mesh_data`].
pub fn load_mesh(path: &Path) -> MeshResult<Mesh> {
    let soup = load_polygon_soup(path)?;
    let mut mesh = soup.to_mesh();

    let before = mesh.faces.len();
    mesh.faces.retain(|&[a, b, c]| a != b && b != c && c != a);
    if mesh.faces.len() < before {
        warn!(dropped = before - mesh.faces.len(), "Skipped degenerate triangles");
    }

    if let Some((min, max)) = mesh.bounds() {
        let dims = max - min;
        debug!(
            "Bounding box: [{:.3}, {:.3}, {:.3}] to [{:.3}, {:.3}, {:.3}]",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        if dims.max() < 1e-6 {
            warn!("Mesh largest dimension is {:.3e}, may need scaling", dims.max());
        }
    }

    validate_mesh_data(&mesh)?;
    info!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Loaded mesh"
    );
    Ok(mesh)
}

/// Load points and polygons as stored in the file.
pub fn load_polygon_soup(path: &Path) -> MeshResult<PolygonSoup> {
    let format = MeshFormat::require(path)?;
    info!("Loading {:?} (format: {})", path, format);

    let result = match format {
        MeshFormat::Ply => load_ply(path),
        MeshFormat::Obj => load_obj(path),
        MeshFormat::Stl => load_stl(path),
    };
    log_io_operation("load", path, &format.to_string(), result.is_ok());
    let soup = result?;

    debug!(
        points = soup.point_count(),
        polygons = soup.polygon_count(),
        "Read polygon soup"
    );
    Ok(soup)
}

fn open(path: &Path) -> MeshResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| MeshError::io_read(path, e))
}

/// Load PLY (ASCII or binary).
///
/// Expects a `vertex` element with `x`, `y`, `z` and an optional `face`
/// element with a `vertex_indices` (or `vertex_index`) list. Normals
/// (`nx`, `ny`, `nz`) and colors (`red`, `green`, `blue`) are kept when all
/// three components are present.
fn load_ply(path: &Path) -> MeshResult<PolygonSoup> {
    let mut reader = open(path)?;
    let parser = ply_rs::parser::Parser::<ply_rs::ply::DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| MeshError::parse_error(path, format!("PLY parse error: {}", e)))?;

    let mut soup = PolygonSoup::default();

    if let Some(vertices) = ply.payload.get("vertex") {
        soup.points.reserve(vertices.len());
        for element in vertices {
            let x = get_ply_float(element.get("x"), "x", path)?;
            let y = get_ply_float(element.get("y"), "y", path)?;
            let z = get_ply_float(element.get("z"), "z", path)?;
            let mut vertex = Vertex::from_coords(x, y, z);

            if let (Some(nx), Some(ny), Some(nz)) = (
                ply_scalar(element.get("nx")),
                ply_scalar(element.get("ny")),
                ply_scalar(element.get("nz")),
            ) {
                vertex.normal = Some(Vector3::new(nx, ny, nz));
            }
            if let (Some(r), Some(g), Some(b)) = (
                get_ply_u8(element.get("red")),
                get_ply_u8(element.get("green")),
                get_ply_u8(element.get("blue")),
            ) {
                vertex.color = Some(VertexColor::new(r, g, b));
            }
            soup.points.push(vertex);
        }
    }

    if let Some(faces) = ply.payload.get("face") {
        soup.polygons.reserve(faces.len());
        for (face_index, element) in faces.iter().enumerate() {
            let list = element
                .get("vertex_indices")
                .or_else(|| element.get("vertex_index"));
            let polygon = ply_index_list(list).ok_or_else(|| {
                MeshError::parse_error(
                    path,
                    format!("face {} has no usable vertex index list", face_index),
                )
            })?;
            soup.polygons.push(polygon);
        }
    }

    Ok(soup)
}

/// Extract a float value from a PLY property.
fn get_ply_float(prop: Option<&Property>, name: &str, path: &Path) -> MeshResult<f64> {
    ply_scalar(prop).ok_or_else(|| {
        MeshError::parse_error(path, format!("Missing or invalid PLY property: {}", name))
    })
}

fn ply_scalar(prop: Option<&Property>) -> Option<f64> {
    match prop? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

/// Color channel. Integer channels are clamped, float channels scaled from [0, 1].
fn get_ply_u8(prop: Option<&Property>) -> Option<u8> {
    match prop? {
        Property::UChar(v) => Some(*v),
        Property::Char(v) => Some((*v).max(0) as u8),
        Property::UShort(v) => Some((*v).min(255) as u8),
        Property::Short(v) => Some((*v).clamp(0, 255) as u8),
        Property::UInt(v) => Some((*v).min(255) as u8),
        Property::Int(v) => Some((*v).clamp(0, 255) as u8),
        Property::Float(v) => Some((v * 255.0).clamp(0.0, 255.0) as u8),
        Property::Double(v) => Some((v * 255.0).clamp(0.0, 255.0) as u8),
        _ => None,
    }
}

/// Vertex indices of one face. `None` for non-list properties or negative
/// indices.
fn ply_index_list(prop: Option<&Property>) -> Option<Vec<u32>> {
    fn convert<T: Copy + TryInto<u32>>(values: &[T]) -> Option<Vec<u32>> {
        values.iter().map(|&v| v.try_into().ok()).collect()
    }
    match prop? {
        Property::ListInt(v) => convert(v),
        Property::ListUInt(v) => Some(v.clone()),
        Property::ListShort(v) => convert(v),
        Property::ListUShort(v) => convert(v),
        Property::ListChar(v) => convert(v),
        Property::ListUChar(v) => convert(v),
        _ => None,
    }
}

/// Load OBJ without triangulating. All objects and groups land in one soup.
fn load_obj(path: &Path) -> MeshResult<PolygonSoup> {
    let mut reader = open(path)?;
    let (models, _materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: false,
            single_index: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )
    .map_err(|e| MeshError::parse_error(path, e.to_string()))?;

    let mut soup = PolygonSoup::default();
    for model in &models {
        let obj_mesh = &model.mesh;
        let offset = soup.points.len() as u32;
        let has_normals = obj_mesh.normals.len() == obj_mesh.positions.len();

        for (i, p) in obj_mesh.positions.chunks_exact(3).enumerate() {
            let mut vertex = Vertex::from_coords(p[0], p[1], p[2]);
            if has_normals {
                let n = &obj_mesh.normals[3 * i..3 * i + 3];
                vertex.normal = Some(Vector3::new(n[0], n[1], n[2]));
            }
            soup.points.push(vertex);
        }

        // Empty arities mean every face is a triangle.
        if obj_mesh.face_arities.is_empty() {
            for tri in obj_mesh.indices.chunks_exact(3) {
                soup.polygons.push(tri.iter().map(|&i| i + offset).collect());
            }
        } else {
            let mut start = 0usize;
            for &arity in &obj_mesh.face_arities {
                let end = start + arity as usize;
                let Some(corners) = obj_mesh.indices.get(start..end) else {
                    return Err(MeshError::parse_error(path, "face index list is truncated"));
                };
                soup.polygons.push(corners.iter().map(|&i| i + offset).collect());
                start = end;
            }
        }
        debug!(name = %model.name, "Read OBJ model");
    }

    Ok(soup)
}

/// Load STL (binary or ASCII). Coincident corners are merged by the reader.
fn load_stl(path: &Path) -> MeshResult<PolygonSoup> {
    let mut reader = open(path)?;
    let stl = stl_io::read_stl(&mut reader).map_err(|e| MeshError::parse_error(path, e.to_string()))?;

    let points = stl
        .vertices
        .iter()
        .map(|v| Vertex::from_coords(v.0[0] as f64, v.0[1] as f64, v.0[2] as f64))
        .collect();
    let polygons = stl
        .faces
        .iter()
        .map(|f| f.vertices.iter().map(|&i| i as u32).collect())
        .collect();
    Ok(PolygonSoup::new(points, polygons))
}

/// Save a triangle mesh, auto-detecting format from extension.
pub fn save_mesh(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    save_polygons(&mesh.vertices, &mesh.faces, path)
}

/// Save a polygon soup. STL output fan-triangulates each polygon.
pub fn save_polygon_soup(soup: &PolygonSoup, path: &Path) -> MeshResult<()> {
    save_polygons(&soup.points, &soup.polygons, path)
}

fn save_polygons<P: AsRef<[u32]>>(points: &[Vertex], polygons: &[P], path: &Path) -> MeshResult<()> {
    let format = MeshFormat::require(path)?;
    info!("Saving {} vertices and {} faces to {:?}", points.len(), polygons.len(), path);

    let result = match format {
        MeshFormat::Ply => save_ply(points, polygons, path),
        MeshFormat::Obj => save_obj(points, polygons, path),
        MeshFormat::Stl => save_stl(points, polygons, path),
    };
    log_io_operation("save", path, &format.to_string(), result.is_ok());
    result
}

fn create(path: &Path) -> MeshResult<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| MeshError::io_write(path, e))
}

/// ASCII PLY with `double` coordinates.
///
/// Values are printed in shortest round-trip form, so reloading the file
/// reproduces every coordinate bit for bit.
fn save_ply<P: AsRef<[u32]>>(points: &[Vertex], polygons: &[P], path: &Path) -> MeshResult<()> {
    use ply_rs::ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, PropertyDef, PropertyType, ScalarType,
    };
    use ply_rs::writer::Writer;

    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;

    let has_normals = points.iter().any(|v| v.normal.is_some());
    let has_colors = points.iter().any(|v| v.color.is_some());

    let scalar = |name: &str, ty: ScalarType| PropertyDef::new(name.to_string(), PropertyType::Scalar(ty));
    let mut vertex_def = ElementDef::new("vertex".to_string());
    for name in ["x", "y", "z"] {
        vertex_def.properties.add(scalar(name, ScalarType::Double));
    }
    if has_normals {
        for name in ["nx", "ny", "nz"] {
            vertex_def.properties.add(scalar(name, ScalarType::Double));
        }
    }
    if has_colors {
        for name in ["red", "green", "blue"] {
            vertex_def.properties.add(scalar(name, ScalarType::UChar));
        }
    }
    ply.header.elements.add(vertex_def);

    let longest = polygons.iter().map(|p| p.as_ref().len()).max().unwrap_or(0);
    let count_type = if longest > u8::MAX as usize {
        ScalarType::UInt
    } else {
        ScalarType::UChar
    };
    let mut face_def = ElementDef::new("face".to_string());
    face_def.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(count_type, ScalarType::UInt),
    ));
    ply.header.elements.add(face_def);

    let mut vertex_payload = Vec::with_capacity(points.len());
    for v in points {
        let mut element = DefaultElement::new();
        element.insert("x".to_string(), Property::Double(v.position.x));
        element.insert("y".to_string(), Property::Double(v.position.y));
        element.insert("z".to_string(), Property::Double(v.position.z));
        if has_normals {
            let n = v.normal.unwrap_or_else(Vector3::zeros);
            element.insert("nx".to_string(), Property::Double(n.x));
            element.insert("ny".to_string(), Property::Double(n.y));
            element.insert("nz".to_string(), Property::Double(n.z));
        }
        if has_colors {
            let c = v.color.unwrap_or(VertexColor::new(255, 255, 255));
            element.insert("red".to_string(), Property::UChar(c.r));
            element.insert("green".to_string(), Property::UChar(c.g));
            element.insert("blue".to_string(), Property::UChar(c.b));
        }
        vertex_payload.push(element);
    }
    ply.payload.insert("vertex".to_string(), vertex_payload);

    let face_payload = polygons
        .iter()
        .map(|p| {
            let mut element = DefaultElement::new();
            element.insert("vertex_indices".to_string(), Property::ListUInt(p.as_ref().to_vec()));
            element
        })
        .collect();
    ply.payload.insert("face".to_string(), face_payload);

    // Header counts are filled in from the payload.
    ply.make_consistent().map_err(|e| {
        MeshError::io_write(path, std::io::Error::other(format!("PLY consistency error: {:?}", e)))
    })?;

    let mut writer = create(path)?;
    Writer::new()
        .write_ply(&mut writer, &mut ply)
        .map_err(|e| MeshError::io_write(path, e))?;
    writer.flush().map_err(|e| MeshError::io_write(path, e))
}

fn save_obj<P: AsRef<[u32]>>(points: &[Vertex], polygons: &[P], path: &Path) -> MeshResult<()> {
    let mut writer = create(path)?;
    write_obj(&mut writer, points, polygons).map_err(|e| MeshError::io_write(path, e))
}

fn write_obj<W: Write, P: AsRef<[u32]>>(out: &mut W, points: &[Vertex], polygons: &[P]) -> std::io::Result<()> {
    writeln!(out, "# Vertices: {}", points.len())?;
    writeln!(out, "# Faces: {}", polygons.len())?;

    let has_normals = points.iter().any(|v| v.normal.is_some());
    for v in points {
        writeln!(out, "v {} {} {}", v.position.x, v.position.y, v.position.z)?;
    }
    if has_normals {
        for v in points {
            let n = v.normal.unwrap_or_else(Vector3::zeros);
            writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
        }
    }

    // OBJ indices are 1-based.
    for poly in polygons {
        write!(out, "f")?;
        for &i in poly.as_ref() {
            if has_normals {
                write!(out, " {}//{}", i + 1, i + 1)?;
            } else {
                write!(out, " {}", i + 1)?;
            }
        }
        writeln!(out)?;
    }
    out.flush()
}

/// Binary STL. Facet normals are recomputed from the corners.
fn save_stl<P: AsRef<[u32]>>(points: &[Vertex], polygons: &[P], path: &Path) -> MeshResult<()> {
    let corner = |i: u32| {
        points.get(i as usize).map(|v| v.position).ok_or_else(|| {
            MeshError::io_write(
                path,
                std::io::Error::other(format!("face references missing vertex {}", i)),
            )
        })
    };
    let to_f32 = |v: Vector3<f64>| [v.x as f32, v.y as f32, v.z as f32];

    let mut triangles = Vec::with_capacity(polygons.len());
    for poly in polygons {
        let poly = poly.as_ref();
        for i in 1..poly.len().saturating_sub(1) {
            let tri = Triangle::new(corner(poly[0])?, corner(poly[i])?, corner(poly[i + 1])?);
            let normal = tri.normal().unwrap_or_else(Vector3::zeros);
            triangles.push(stl_io::Triangle {
                normal: stl_io::Normal::new(to_f32(normal)),
                vertices: [
                    stl_io::Vertex::new(to_f32(tri.v0.coords)),
                    stl_io::Vertex::new(to_f32(tri.v1.coords)),
                    stl_io::Vertex::new(to_f32(tri.v2.coords)),
                ],
            });
        }
    }

    let mut writer = create(path)?;
    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| MeshError::io_write(path, e))?;
    writer.flush().map_err(|e| MeshError::io_write(path, e))
}
