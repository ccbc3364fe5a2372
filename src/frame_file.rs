//! Reads and writes captured depth frames.
//!
//! A frame dump is one text header line followed by the raw sample bytes:
//!
//! ```text
//! +DEPTH:hdep,256,192
//! <256 * 192 * 2 bytes of little-endian half floats>
//! ```
//!
//! The header names the [PixelFormat] by its tag and gives the sensor width
//! and height. Nothing is checked against the payload here; that is the
//! decoder's job, so that a bad dump is rejected the same way a bad live
//! frame would be.

use crate::depth_frame::{DepthFrame, PixelFormat};
use crate::error::SonifyError;

use nom::{
    bytes::complete::tag,
    character::complete::{alpha1, char, line_ending, u32},
    combinator::{map_res, opt},
    sequence::{preceded, terminated, tuple},
    Finish, IResult,
};
use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    pixel_format: PixelFormat,
    width: usize,
    height: usize,
}

fn parse_pixel_format(s: &[u8]) -> IResult<&[u8], PixelFormat> {
    map_res(alpha1, |tag: &[u8]| {
        std::str::from_utf8(tag)
            .map_err(|e| SonifyError::FrameHeader(e.to_string()))
            .and_then(str::parse::<PixelFormat>)
    })(s)
}

fn parse_header(s: &[u8]) -> IResult<&[u8], FrameHeader> {
    let (rest, (pixel_format, width, height)) = terminated(
        tuple((
            preceded(tag("+DEPTH:"), parse_pixel_format),
            preceded(char(','), u32),
            preceded(char(','), u32),
        )),
        opt(line_ending),
    )(s)?;

    Ok((
        rest,
        FrameHeader {
            pixel_format,
            width: width as usize,
            height: height as usize,
        },
    ))
}

/// Parses a frame dump held in memory.
pub fn parse_frame(bytes: &[u8]) -> Result<DepthFrame, SonifyError> {
    match parse_header(bytes).finish() {
        Ok((payload, header)) => Ok(DepthFrame {
            bytes: payload.to_vec(),
            width: header.width,
            height: header.height,
            pixel_format: header.pixel_format,
        }),
        Err(nom::error::Error { input, code }) => {
            let near: String = String::from_utf8_lossy(&input[..input.len().min(16)]).into_owned();
            Err(SonifyError::FrameHeader(format!("{code:?} near {near:?}")))
        }
    }
}

/// Reads a frame dump from the [Read]able object provided.
pub fn read_frame(file: &mut impl Read) -> Result<DepthFrame, SonifyError> {
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;
    parse_frame(&raw)
}

/// Reads a frame dump from the path provided.
pub fn read_frame_path(path: impl AsRef<Path>) -> Result<DepthFrame, SonifyError> {
    let mut handle = File::open(path)?;
    read_frame(&mut handle)
}

/// Writes a frame dump to the [Write]able object provided.
pub fn write_frame(frame: &DepthFrame, file: &mut impl Write) -> Result<(), SonifyError> {
    writeln!(
        file,
        "+DEPTH:{},{},{}",
        frame.pixel_format, frame.width, frame.height
    )?;
    file.write_all(&frame.bytes)?;
    Ok(())
}

/// Writes a frame dump to the path provided.
pub fn write_frame_path(frame: &DepthFrame, path: impl AsRef<Path>) -> Result<(), SonifyError> {
    let mut handle = File::create(path)?;
    write_frame(frame, &mut handle)
}
