use crate::detection::Detection;
use crate::error::Error;

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Object detector collaborator: returns every box found on a frame,
/// possibly none. Invoked once per frame, in frame order.
pub trait Detector<F> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>, Self::Error>;
}

impl<F, D: Detector<F> + ?Sized> Detector<F> for &mut D {
    type Error = D::Error;

    #[inline]
    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>, Self::Error> {
        (**self).detect(frame)
    }
}

/// Replays pre-computed detector output, one line per frame:
///
/// ```text
/// 40: [{"x":15.0,"y":15.0,"w":10.0,"h":10.0,"p":0.91,"c":0}]
/// ```
///
/// The part before the first `:` (the frame offset) is ignored. A line
/// without `:` or a dump that ran out of lines yields no detections.
pub struct ReplayDetector<R = BufReader<File>> {
    lines: Lines<R>,
    line: usize,
}

impl ReplayDetector {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;

        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplayDetector<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    fn next_detections(&mut self) -> Result<Vec<Detection>, Error> {
        let line = match self.lines.next() {
            Some(line) => line?,
            None => return Ok(Vec::new()),
        };
        self.line += 1;

        match line.find(':') {
            Some(idx) => {
                let (_, vector) = line.split_at(idx + 1);
                serde_json::from_str(vector).map_err(|source| Error::DetectionDump {
                    line: self.line,
                    source,
                })
            }
            None => Ok(Vec::new()),
        }
    }
}

impl<F, R: BufRead> Detector<F> for ReplayDetector<R> {
    type Error = Error;

    #[inline]
    fn detect(&mut self, _frame: &F) -> Result<Vec<Detection>, Self::Error> {
        self.next_detections()
    }
}
