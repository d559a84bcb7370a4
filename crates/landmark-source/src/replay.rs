//! JSON-lines replay of recorded landmark streams
//!
//! Each non-empty line holds one frame, either with the monitored roles
//! already picked out (`LandmarkFrame`) or with the raw face mesh:
//!
//! ```text
//! {"timestamp":0,"image_width":640,"image_height":480,"mesh":[[0.41,0.37], ...]}
//! {"timestamp":33333333,"image_width":640,"image_height":480,"mesh":null}
//! ```

use crate::frame::{FaceLandmarks, LandmarkFrame, Point2, Timestamp};
use crate::LandmarkError;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MeshRecord {
    timestamp: Timestamp,
    #[serde(default)]
    sequence: Option<u64>,
    image_width: u32,
    image_height: u32,
    mesh: Option<Vec<[f64; 2]>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayRecord {
    Mesh(MeshRecord),
    Frame(LandmarkFrame),
}

/// Reads landmark frames from a JSON-lines stream
pub struct LandmarkReplay<R> {
    reader: R,
    line_number: usize,
    frames_read: u64,
    buf: String,
}

impl LandmarkReplay<BufReader<File>> {
    /// Open a recorded landmark file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LandmarkError> {
        let path = path.as_ref();
        info!("Opening landmark replay {}", path.display());
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LandmarkReplay<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            frames_read: 0,
            buf: String::new(),
        }
    }

    /// Read the next frame, `Ok(None)` at end of stream
    pub fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, LandmarkError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                debug!("Replay finished after {} frames", self.frames_read);
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buf.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let record: ReplayRecord =
                serde_json::from_str(line).map_err(|e| LandmarkError::Parse {
                    line: self.line_number,
                    reason: e.to_string(),
                })?;

            let frame = self.build_frame(record)?;
            self.frames_read += 1;
            return Ok(Some(frame));
        }
    }

    fn build_frame(&self, record: ReplayRecord) -> Result<LandmarkFrame, LandmarkError> {
        match record {
            ReplayRecord::Frame(frame) => Ok(frame),
            ReplayRecord::Mesh(mesh) => {
                let sequence = mesh.sequence.unwrap_or(self.frames_read);
                let face = match mesh.mesh {
                    Some(points) => {
                        let points: Vec<Point2> =
                            points.iter().map(|[x, y]| Point2::new(*x, *y)).collect();
                        Some(FaceLandmarks::from_mesh(&points).map_err(|e| {
                            LandmarkError::Parse {
                                line: self.line_number,
                                reason: e.to_string(),
                            }
                        })?)
                    }
                    None => None,
                };
                Ok(LandmarkFrame {
                    timestamp: mesh.timestamp,
                    sequence,
                    image_width: mesh.image_width,
                    image_height: mesh.image_height,
                    face,
                })
            }
        }
    }

    /// Frames successfully read so far
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}
