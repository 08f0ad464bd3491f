//! Hand-built multipart/form-data framing for the single firmware field

use crate::protocol::{part, CRLF, SUCCESS_MARKER};

#[derive(Debug, Clone)]
pub struct Multipart {
    boundary: String,
}

impl Multipart {
    /// Fresh random boundary.
    pub fn new() -> Self {
        Multipart {
            boundary: generate_boundary(),
        }
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Multipart {
            boundary: boundary.into(),
        }
    }

    /// Request line plus headers, terminated by the blank line.
    pub fn request_head(&self, host: &str, path: &str, file_len: u64) -> String {
        format!(
            "POST {path} HTTP/1.1{crlf}\
             Host: {host}{crlf}\
             Content-Length: {len}{crlf}\
             Content-Type: multipart/form-data; boundary={boundary}{crlf}\
             Connection: Keep-Alive{crlf}\
             {crlf}",
            path = path,
            host = host,
            len = self.content_length(file_len),
            boundary = self.boundary,
            crlf = CRLF,
        )
    }

    /// Opening boundary and part headers, up to the first file byte.
    pub fn part_head(&self) -> String {
        format!(
            "--{b}{crlf}{cd}{crlf}{ct}{crlf}{crlf}",
            b = self.boundary,
            cd = part::CONTENT_DISPOSITION,
            ct = part::CONTENT_TYPE,
            crlf = CRLF,
        )
    }

    /// Line break after the file data plus the closing boundary.
    pub fn closing(&self) -> String {
        format!("{crlf}--{b}--{crlf}", b = self.boundary, crlf = CRLF)
    }

    /// Body size: part head + file + closing, counted from the fragments sent.
    pub fn content_length(&self, file_len: u64) -> u64 {
        self.part_head().len() as u64 + file_len + self.closing().len() as u64
    }
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

/// 27 dashes followed by 11 random lowercase hex digits.
pub fn generate_boundary() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}{}",
        part::BOUNDARY_PREFIX,
        &random[..part::BOUNDARY_RANDOM_LEN]
    )
}

/// Substring match for the device's success text anywhere in the reply.
pub fn is_success(response: &str) -> bool {
    response.contains(SUCCESS_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(mp: &Multipart, file: &[u8]) -> Vec<u8> {
        let mut body = mp.part_head().into_bytes();
        body.extend_from_slice(file);
        body.extend_from_slice(mp.closing().as_bytes());
        body
    }

    #[test]
    fn content_length_matches_assembled_body() {
        let mp = Multipart::new();
        for len in [0usize, 1, 511, 512, 513, 1024, 70_001] {
            let file = vec![0x5Au8; len];
            assert_eq!(mp.content_length(len as u64), assemble(&mp, &file).len() as u64);
        }
    }

    #[test]
    fn content_length_formula() {
        let mp = Multipart::with_boundary("B");
        // "--B" CRLF + CD CRLF + CT CRLF + CRLF + file + CRLF + "--B--" CRLF
        let expected = 3 + 2
            + part::CONTENT_DISPOSITION.len() as u64 + 2
            + part::CONTENT_TYPE.len() as u64 + 2
            + 2
            + 100
            + 2 + 5 + 2;
        assert_eq!(mp.content_length(100), expected);
    }

    #[test]
    fn request_head_layout() {
        let mp = Multipart::with_boundary("XYZ");
        let head = mp.request_head("127.0.0.1", "/upgrade.cgi", 10);
        let lines: Vec<&str> = head.split("\r\n").collect();
        assert_eq!(lines[0], "POST /upgrade.cgi HTTP/1.1");
        assert_eq!(lines[1], "Host: 127.0.0.1");
        assert_eq!(lines[2], format!("Content-Length: {}", mp.content_length(10)));
        assert_eq!(lines[3], "Content-Type: multipart/form-data; boundary=XYZ");
        assert_eq!(lines[4], "Connection: Keep-Alive");
        assert_eq!(&lines[5..], &["", ""]);
        assert!(!head.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn part_head_and_closing() {
        let mp = Multipart::with_boundary("XYZ");
        assert_eq!(
            mp.part_head(),
            "--XYZ\r\nContent-Disposition: form-data; name=\"firmware\"; filename=\"firmware.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        );
        assert_eq!(mp.closing(), "\r\n--XYZ--\r\n");
    }

    #[test]
    fn boundary_shape() {
        let b = generate_boundary();
        assert_eq!(b.len(), 27 + 11);
        assert!(b.starts_with(part::BOUNDARY_PREFIX));
        assert!(b[27..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(generate_boundary(), generate_boundary());
    }

    #[test]
    fn success_marker_is_substring_match() {
        assert!(is_success("Upgrade successfully!"));
        assert!(is_success(
            "HTTP/1.1 200 OK\r\n\r\n<html><body>Upgrade successfully!</body></html>"
        ));
        assert!(!is_success("HTTP/1.1 200 OK\r\n\r\nUpgrade failed"));
        assert!(!is_success("upgrade successfully!"));
        assert!(!is_success(""));
    }
}
