use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub trait Logger: Send + Sync {
    fn start(&self, _firmware: &Path, _bytes: u64, _sha256: &str, _target: &str) {}
    fn connected(&self, _target: &str) {}
    fn sent(&self, _step: &str, _bytes: u64) {}
    fn response(&self, _text: &str) {}
    fn error(&self, _context: &str, _msg: &str) {}
    fn done(&self, _bytes: u64, _seconds: f64) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn start(&self, firmware: &Path, bytes: u64, sha256: &str, target: &str) {
        self.line(&format!(
            "START firmware={} bytes={} sha256={} target={}",
            firmware.display(),
            bytes,
            sha256,
            target
        ));
    }
    fn connected(&self, target: &str) {
        self.line(&format!("CONNECT target={target}"));
    }
    fn sent(&self, step: &str, bytes: u64) {
        self.line(&format!("SENT step={step} bytes={bytes}"));
    }
    fn response(&self, text: &str) {
        self.line(&format!("RESPONSE {:?}", text));
    }
    fn error(&self, context: &str, msg: &str) {
        self.line(&format!("ERROR ctx={} msg={}", context, msg));
    }
    fn done(&self, bytes: u64, seconds: f64) {
        self.line(&format!("DONE bytes={bytes} seconds={seconds:.3}"));
    }
}
