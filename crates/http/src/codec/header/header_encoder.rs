//! Serialization helpers shared by the request and response encoders.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::HeaderMap;

/// Writes every header as `name: value\r\n`, followed by the blank line ending the head.
pub fn write_headers(headers: &HeaderMap, dst: &mut BytesMut) {
    for (header_name, header_value) in headers.iter() {
        dst.put_slice(header_name.as_ref());
        dst.put_slice(b": ");
        dst.put_slice(header_value.as_ref());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
}

/// [`Write`] adapter appending to a [`BytesMut`], used to format start lines.
#[derive(Debug)]
pub struct FastWrite<'a>(pub &'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use http::header::{CONTENT_TYPE, SET_COOKIE};

    #[test]
    fn repeated_headers_keep_their_own_lines() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));

        let mut dst = BytesMut::new();
        write_headers(&headers, &mut dst);

        assert_eq!(&dst[..], &b"content-type: text/plain\r\nset-cookie: a=1\r\nset-cookie: b=2\r\n\r\n"[..]);
    }
}
