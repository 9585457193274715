use crate::bbox::BoundingBox;
use crate::geometry::{centroid, Point};

use std::convert::Infallible;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

pub const COLUMNS: [&str; 8] = ["frame", "x1", "y1", "x2", "y2", "cx", "cy", "visibility"];

/// One row of the detection log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionRecord {
    pub frame: u64,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub cx: i32,
    pub cy: i32,
    pub visibility: u8,
}

impl DetectionRecord {
    pub fn detected(frame: u64, bbox: &BoundingBox) -> Self {
        let c = centroid(bbox);

        Self {
            frame,
            x1: bbox.left(),
            y1: bbox.top(),
            x2: bbox.right(),
            y2: bbox.bottom(),
            cx: c.x,
            cy: c.y,
            visibility: 1,
        }
    }

    /// Sentinel row for a frame with nothing detected.
    pub fn missing(frame: u64) -> Self {
        Self {
            frame,
            x1: 0.0,
            y1: 0.0,
            x2: 0.0,
            y2: 0.0,
            cx: 0,
            cy: 0,
            visibility: 0,
        }
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visibility == 1
    }

    #[inline]
    pub fn centroid(&self) -> Point {
        Point::new(self.cx, self.cy)
    }

    pub fn write_row<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            self.frame, self.x1, self.y1, self.x2, self.y2, self.cx, self.cy, self.visibility
        )
    }
}

/// Receives a video's complete detection log in one batch.
pub trait RecordSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn write_records(&mut self, records: &[DetectionRecord]) -> Result<(), Self::Error>;
}

impl RecordSink for Vec<DetectionRecord> {
    type Error = Infallible;

    fn write_records(&mut self, records: &[DetectionRecord]) -> Result<(), Self::Error> {
        self.extend_from_slice(records);
        Ok(())
    }
}

/// Header line followed by one comma separated row per record.
pub fn write_csv<W: Write>(out: &mut W, records: &[DetectionRecord]) -> std::io::Result<()> {
    writeln!(out, "{}", COLUMNS.join(","))?;
    for rec in records {
        rec.write_row(out)?;
    }

    Ok(())
}

/// Writes the log as CSV. The file is only created when records arrive.
#[derive(Debug, Clone)]
pub struct CsvRecordSink {
    path: PathBuf,
}

impl CsvRecordSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for CsvRecordSink {
    type Error = std::io::Error;

    fn write_records(&mut self, records: &[DetectionRecord]) -> Result<(), Self::Error> {
        let mut out = BufWriter::new(File::create(&self.path)?);
        write_csv(&mut out, records)?;
        out.flush()?;

        tracing::info!(path = %self.path.display(), rows = records.len(), "annotations saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;

    #[test]
    fn detected_row() {
        let rec = DetectionRecord::detected(0, &BBox::ltrb(10.0, 10.0, 20.0, 20.0));
        let mut out = Vec::new();
        rec.write_row(&mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "0,10,10,20,20,15,15,1\n");
        assert!(rec.is_visible());
    }

    #[test]
    fn missing_row() {
        let rec = DetectionRecord::missing(3);
        let mut out = Vec::new();
        rec.write_row(&mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "3,0,0,0,0,0,0,0\n");
        assert_eq!(rec.centroid(), Point::new(0, 0));
    }

    #[test]
    fn csv_has_fixed_header() {
        let mut out = Vec::new();
        write_csv(&mut out, &[DetectionRecord::detected(0, &BBox::ltrb(1.5, 2.0, 3.5, 4.0))]).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "frame,x1,y1,x2,y2,cx,cy,visibility\n0,1.5,2,3.5,4,2,3,1\n"
        );
    }

    #[test]
    fn csv_sink_creates_file_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip_output.csv");
        let mut sink = CsvRecordSink::new(&path);
        assert!(!path.exists());

        sink.write_records(&[DetectionRecord::missing(0)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "frame,x1,y1,x2,y2,cx,cy,visibility\n0,0,0,0,0,0,0,0\n");
    }
}
