/// STL decoding for binary and ASCII files
use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{multispace0, multispace1},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, tuple},
    IResult,
};
use thiserror::Error;

use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

#[derive(Debug, Error, PartialEq)]
pub enum StlError {
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),
    #[error("binary STL declares {declared} triangles but only {available} fit in the file")]
    Truncated { declared: usize, available: usize },
    #[error("malformed ASCII STL: {0}")]
    Ascii(String),
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(StlError::TooSmall(data.len()));
    }

    let body = &data[HEADER_LEN..];
    let (facets, declared) = le_u32::<_, nom::error::Error<&[u8]>>(body)
        .map_err(|_| StlError::TooSmall(data.len()))?;
    let declared = declared as usize;
    let available = facets.len() / FACET_LEN;
    if available < declared {
        return Err(StlError::Truncated {
            declared,
            available,
        });
    }

    let (_, triangles) = count(binary_facet, declared)(facets).map_err(|_| StlError::Truncated {
        declared,
        available,
    })?;

    Ok(Mesh { triangles })
}

fn binary_vector(input: &[u8]) -> IResult<&[u8], (f32, f32, f32)> {
    tuple((le_f32, le_f32, le_f32))(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, (nx, ny, nz)) = binary_vector(input)?;
    let (input, corners) = count(binary_vector, 3)(input)?;
    // Attribute byte count, unused
    let (input, _) = le_u16(input)?;

    let normal = Vector3::new(nx, ny, nz);
    let vertex = |(x, y, z): (f32, f32, f32)| Vertex::new(Point3::new(x, y, z), normal);
    Ok((
        input,
        Triangle::new(vertex(corners[0]), vertex(corners[1]), vertex(corners[2])),
    ))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, StlError> {
    match ascii_solid(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(StlError::Ascii(e.to_string())),
    }
}

fn ascii_solid(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    // Optional solid name up to end of line
    let (input, _) = take_till(|c: char| c == '\n')(input)?;
    let (input, triangles) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;

    Ok((input, Mesh { triangles }))
}

fn ascii_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, (nx, ny, nz)) = ascii_vector(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;

    let normal = Vector3::new(nx, ny, nz);
    let (input, v1) = ascii_vertex(input, normal)?;
    let (input, v2) = ascii_vertex(input, normal)?;
    let (input, v3) = ascii_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn ascii_vertex(input: &str, normal: Vector3<f32>) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = ascii_vector(input)?;
    Ok((input, Vertex::new(Point3::new(x, y, z), normal)))
}

fn ascii_vector(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, x) = preceded(multispace0, float)(input)?;
    let (input, y) = preceded(multispace1, float)(input)?;
    let (input, z) = preceded(multispace1, float)(input)?;
    Ok((input, (x, y, z)))
}

/// Detect the STL flavour and parse it.
///
/// Binary files may also begin with `solid` in their header, so an ASCII
/// parse failure falls back to binary.
pub fn parse_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}
